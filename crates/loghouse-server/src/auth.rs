//! Authorization Collaborator
//!
//! Every RPC is gated by an injected [`Authorizer`] before it touches the
//! log. The server does not evaluate policy itself; it only asks the
//! collaborator whether `subject` may perform `action` on `object` and
//! short-circuits with `PermissionDenied` when the answer is no.
//!
//! The subject is whatever identity the transport layer attached to the
//! request as an [`Identity`] extension (for example, the peer certificate
//! subject when mutual TLS is configured upstream). Requests without an
//! attached identity act as the anonymous subject.

use tonic::{Request, Status};

/// Object name covering the whole log.
pub const OBJECT_WILDCARD: &str = "*";
/// Action name for appends.
pub const PRODUCE_ACTION: &str = "produce";
/// Action name for reads.
pub const CONSUME_ACTION: &str = "consume";

/// Client identity attached to a request by the transport layer.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

/// Extract the subject used for authorization checks.
pub fn subject<T>(request: &Request<T>) -> String {
    request
        .extensions()
        .get::<Identity>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Predicate deciding whether `subject` may perform `action` on `object`.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<(), Status>;
}

/// Permits every request; the default when no policy engine is wired in.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _subject: &str, _object: &str, _action: &str) -> Result<(), Status> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_defaults_to_anonymous() {
        let request = Request::new(());
        assert_eq!(subject(&request), "");
    }

    #[test]
    fn test_subject_reads_attached_identity() {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(Identity("client-a".to_string()));
        assert_eq!(subject(&request), "client-a");
    }

    #[test]
    fn test_allow_all_permits_everything() {
        let auth = AllowAll;
        assert!(auth.authorize("", OBJECT_WILDCARD, PRODUCE_ACTION).is_ok());
        assert!(auth
            .authorize("anyone", OBJECT_WILDCARD, CONSUME_ACTION)
            .is_ok());
    }
}
