//! Optimistic-concurrency checks for `If-Match` / `If-None-Match`.

use crate::context::RequestContext;

/// Precondition failures. Each maps to HTTP 412.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ETagError {
    #[error("requested resource does not exist")]
    RequestedResourceDoesNotExist,
    #[error("etags do not match")]
    ETagsDoNotMatch,
    #[error("resource already exists")]
    ResourceAlreadyExists,
}

/// Validates the request preconditions against the stored ETag.
///
/// `etag` is the ETag of the stored resource, or empty when no resource
/// exists. `If-Match` is checked first.
///
/// # Errors
///
/// Returns the [`ETagError`] describing the failed precondition.
pub fn validate_etag(ctx: &RequestContext, etag: &str) -> Result<(), ETagError> {
    check_if_match(&ctx.if_match, etag)?;
    check_if_none_match(&ctx.if_none_match, etag)
}

fn check_if_match(if_match: &str, etag: &str) -> Result<(), ETagError> {
    if if_match.is_empty() {
        return Ok(());
    }
    if etag.is_empty() {
        return Err(ETagError::RequestedResourceDoesNotExist);
    }
    if if_match != "*" && if_match != etag {
        return Err(ETagError::ETagsDoNotMatch);
    }
    Ok(())
}

fn check_if_none_match(if_none_match: &str, etag: &str) -> Result<(), ETagError> {
    if if_none_match == "*" && !etag.is_empty() {
        return Err(ETagError::ResourceAlreadyExists);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::ResourceId;

    fn ctx(if_match: &str, if_none_match: &str) -> RequestContext {
        let mut ctx = RequestContext::new(ResourceId::parse("/planes/radius/local").unwrap());
        ctx.if_match = if_match.to_string();
        ctx.if_none_match = if_none_match.to_string();
        ctx
    }

    #[test]
    fn truth_table() {
        let cases = [
            ("", "", "", Ok(())),
            ("", "", "abc", Ok(())),
            ("*", "", "", Err(ETagError::RequestedResourceDoesNotExist)),
            ("abc", "", "", Err(ETagError::RequestedResourceDoesNotExist)),
            ("*", "", "abc", Ok(())),
            ("abc", "", "abc", Ok(())),
            ("xyz", "", "abc", Err(ETagError::ETagsDoNotMatch)),
            ("", "*", "", Ok(())),
            ("", "*", "abc", Err(ETagError::ResourceAlreadyExists)),
            ("", "abc", "abc", Ok(())),
        ];
        for (if_match, if_none_match, etag, expected) in cases {
            assert_eq!(
                validate_etag(&ctx(if_match, if_none_match), etag),
                expected,
                "If-Match={if_match:?} If-None-Match={if_none_match:?} etag={etag:?}"
            );
        }
    }

    #[test]
    fn error_messages() {
        assert_eq!(ETagError::ETagsDoNotMatch.to_string(), "etags do not match");
        assert_eq!(
            ETagError::RequestedResourceDoesNotExist.to_string(),
            "requested resource does not exist"
        );
        assert_eq!(ETagError::ResourceAlreadyExists.to_string(), "resource already exists");
    }
}
