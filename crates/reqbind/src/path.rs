//! Path parameter lookup.
//!
//! The binder does not know how routes are matched. It asks a [`PathLookup`]
//! for the value of each declared path field; the default reads the
//! [`Params`](crate::Params) stored on the request by the router.

use crate::RequestContext;

/// Resolves a path parameter by name for the current request.
///
/// Returning `None` means the parameter is absent; the field is left
/// untouched.
///
/// Any `Fn(&RequestContext, &str) -> Option<&str>` is a lookup, which makes
/// adapting a router a one-liner:
///
/// ```rust
/// use reqbind::{PathLookup, RequestContext};
///
/// fn from_header<'r>(request: &'r RequestContext, name: &str) -> Option<&'r str> {
///     request.headers().get(name)?.to_str().ok()
/// }
///
/// let request = RequestContext::builder().header("id", "7").build();
/// assert_eq!(from_header.lookup(&request, "id"), Some("7"));
/// ```
pub trait PathLookup: Send + Sync {
    /// Returns the value captured for `name`, if any.
    fn lookup<'r>(&self, request: &'r RequestContext, name: &str) -> Option<&'r str>;
}

/// Reads captures from [`RequestContext::path_params`].
///
/// An empty capture is reported as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterParams;

impl PathLookup for RouterParams {
    fn lookup<'r>(&self, request: &'r RequestContext, name: &str) -> Option<&'r str> {
        request.path_params().get(name).filter(|v| !v.is_empty())
    }
}

/// A lookup that never finds anything, for binders without a router.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPathParams;

impl PathLookup for NoPathParams {
    fn lookup<'r>(&self, _request: &'r RequestContext, _name: &str) -> Option<&'r str> {
        None
    }
}

impl<F> PathLookup for F
where
    F: for<'r> Fn(&'r RequestContext, &str) -> Option<&'r str> + Send + Sync,
{
    fn lookup<'r>(&self, request: &'r RequestContext, name: &str) -> Option<&'r str> {
        self(request, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_params_lookup() {
        let request = RequestContext::builder()
            .path_param("id", "42")
            .path_param("blank", "")
            .build();

        assert_eq!(RouterParams.lookup(&request, "id"), Some("42"));
        assert_eq!(RouterParams.lookup(&request, "blank"), None);
        assert_eq!(RouterParams.lookup(&request, "missing"), None);
    }

    #[test]
    fn test_no_path_params() {
        let request = RequestContext::builder().path_param("id", "42").build();
        assert_eq!(NoPathParams.lookup(&request, "id"), None);
    }

    fn last_segment<'r>(request: &'r RequestContext, name: &str) -> Option<&'r str> {
        if name == "slug" {
            request.uri().path().rsplit('/').next()
        } else {
            None
        }
    }

    #[test]
    fn test_function_lookup() {
        let request = RequestContext::builder().uri_str("/posts/hello-world").build();

        assert_eq!(last_segment.lookup(&request, "slug"), Some("hello-world"));
        assert_eq!(last_segment.lookup(&request, "other"), None);
    }
}
