use crate::{
    codec::{decode, encode},
    config::GeneratorConfig,
    error::{Error, Result},
    window::ScopeWindow,
};

/// Rejects scope names the generator will not serve.
pub(crate) fn validate_scope(scope: &str) -> Result<()> {
    if scope.is_empty() {
        return Err(Error::invalid("scope name must not be empty"));
    }
    Ok(())
}

/// One round of the batch-acquisition protocol: the value observed in the
/// store and the candidate that would replace it.
///
/// Built from a fresh read every round and thrown away on conflict, so a
/// retry never reuses a stale observation.
#[derive(Debug)]
pub(crate) struct Reservation {
    observed: Option<String>,
    start: u64,
    end: u64,
}

impl Reservation {
    /// Computes the candidate counter `observed + batch_size`.
    ///
    /// An absent record stands for `config.initial_value`.
    pub(crate) fn plan(
        scope: &str,
        observed: Option<String>,
        config: &GeneratorConfig,
    ) -> Result<Self> {
        let start = match observed.as_deref() {
            None => config.initial_value,
            Some(raw) => decode(raw).map_err(|err| {
                #[cfg(feature = "tracing")]
                tracing::warn!(scope, raw, error = %err, "stored counter is not a valid u64");
                Error::from_codec(scope, err)
            })?,
        };

        let end = start
            .checked_add(config.batch_size)
            .ok_or_else(|| Error::CounterOverflow {
                scope: scope.to_owned(),
                current: start,
                batch_size: config.batch_size,
            })?;

        Ok(Self {
            observed,
            start,
            end,
        })
    }

    /// Precondition for the conditional write.
    pub(crate) fn expected(&self) -> Option<&str> {
        self.observed.as_deref()
    }

    /// Encoded candidate counter.
    pub(crate) fn candidate(&self) -> String {
        encode(self.end)
    }

    pub(crate) fn start(&self) -> u64 {
        self.start
    }

    pub(crate) fn end(&self) -> u64 {
        self.end
    }

    /// Hands out the first id of a committed reservation and returns the
    /// window holding the rest.
    ///
    /// Requires a non-empty reservation (`end > start`).
    pub(crate) fn claim(self) -> (u64, ScopeWindow) {
        let (start, end) = (self.start(), self.end());
        debug_assert!(end > start);
        (start, ScopeWindow::new(start + 1, end))
    }
}
