//! Emitting and replaying fragment directives

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::domain::DomainError;

use super::directive::{FragmentDirective, FragmentPayload};
use super::registry::FragmentRegistry;

/// 1. opening marker, 2. payload, 3. captured output, 4. closing marker
static UNFRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(<!--\s*cachetop:\s*unfragment:\s*([A-Za-z0-9+/=]*)\s*-->)(.*?)(<!--\s*cachetop:\s*end\s*-->)",
    )
    .unwrap()
});

/// Result of replaying the directives of a cached body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rehydrated {
    pub body: String,
    /// Number of spans whose output changed
    pub replaced: usize,
}

impl Rehydrated {
    /// True if any dynamic span produced new output
    pub fn changed(&self) -> bool {
        self.replaced > 0
    }
}

/// Encodes fragment directives into markup and replays them on cache hits
#[derive(Debug, Clone)]
pub struct FragmentProtocol {
    registry: Arc<FragmentRegistry>,
}

impl FragmentProtocol {
    pub fn new(registry: Arc<FragmentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FragmentRegistry {
        &self.registry
    }

    /// Renders `function(args)` wrapped in a `fragment` directive
    ///
    /// The output is frozen at capture time; `rehydrate` leaves it alone.
    pub fn emit_fragment(
        &self,
        id: &str,
        function: &str,
        args: Vec<Value>,
    ) -> Result<String, DomainError> {
        validate_id(id)?;

        let directive = FragmentDirective::fragment(id, FragmentPayload::new(function, args));
        let output = self.invoke(&directive.payload)?;

        directive.wrap(&output)
    }

    /// Renders `function(args)` (or `function([args])`) wrapped in an
    /// `unfragment` directive that is replayed on every cache hit
    pub fn emit_unfragment(
        &self,
        function: &str,
        args: Vec<Value>,
        pass_args_as_array: bool,
    ) -> Result<String, DomainError> {
        let payload = FragmentPayload::new(function, args).with_args_as_array(pass_args_as_array);
        let directive = FragmentDirective::unfragment(payload);
        let output = self.invoke(&directive.payload)?;

        directive.wrap(&output)
    }

    /// Re-invokes every `unfragment` directive in `cached` and splices in the
    /// fresh output where it differs from the captured span.
    ///
    /// `fragment` directives are not replayed. Malformed payloads and
    /// unregistered functions are skipped; their captured output is kept as is.
    pub fn rehydrate(&self, cached: &str) -> Rehydrated {
        let mut body = String::with_capacity(cached.len());
        let mut replaced = 0;
        let mut last = 0;

        for caps in UNFRAGMENT.captures_iter(cached) {
            let (Some(whole), Some(open), Some(payload), Some(captured), Some(close)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3), caps.get(4))
            else {
                continue;
            };

            body.push_str(&cached[last..whole.start()]);
            last = whole.end();

            let fresh = match FragmentPayload::decode(payload.as_str())
                .and_then(|payload| self.invoke(&payload))
            {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(error = %e, "Skipping unfragment directive");
                    body.push_str(whole.as_str());
                    continue;
                }
            };

            if fresh == captured.as_str() {
                body.push_str(whole.as_str());
            } else {
                body.push_str(open.as_str());
                body.push_str(&fresh);
                body.push_str(close.as_str());
                replaced += 1;
            }
        }

        body.push_str(&cached[last..]);

        Rehydrated { body, replaced }
    }

    fn invoke(&self, payload: &FragmentPayload) -> Result<String, DomainError> {
        self.registry
            .invoke(&payload.function, &payload.call_args())
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Fragment function '{}' is not registered",
                    payload.function
                ))
            })
    }
}

fn validate_id(id: &str) -> Result<(), DomainError> {
    if id.is_empty() || id.contains(':') || id.contains("--") || id.contains(char::is_whitespace) {
        return Err(DomainError::validation(format!(
            "Invalid fragment id '{}'",
            id
        )));
    }

    Ok(())
}
