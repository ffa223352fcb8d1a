//! Identity resolution (C6): turns an inbound request into the string the
//! engine keys its counters on (§4.6, §9).

/// Derives the identity a request is rate-limited under.
///
/// Must never raise: an identity that cannot be determined resolves to
/// `"unknown"` rather than failing the request, so a broken resolver can at
/// worst collapse distinct callers onto one shared bucket.
pub trait Resolver<Request>: Send + Sync {
    /// Resolve `request` to an identity string.
    fn resolve(&self, request: &Request) -> String;
}

/// Resolver that always returns a fixed identity. Useful for a global rule
/// that applies uniformly regardless of caller, and for the CLI harness.
#[derive(Debug, Clone)]
pub struct StaticResolver(pub String);

impl<Request> Resolver<Request> for StaticResolver {
    fn resolve(&self, _request: &Request) -> String {
        self.0.clone()
    }
}
