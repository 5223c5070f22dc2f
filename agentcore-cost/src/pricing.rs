//! Built-in `{model, provider}` pricing table with a fallback rate for
//! models the table doesn't know about.

use rust_decimal::Decimal;
use std::collections::HashMap;

/// Per-1000-token rates, USD.
#[derive(Debug, Clone, Copy)]
pub struct Rates {
    /// Rate per 1000 prompt tokens.
    pub input_per_1k: Decimal,
    /// Rate per 1000 completion tokens.
    pub output_per_1k: Decimal,
    /// Rate per 1000 tokens served from a provider prompt cache.
    pub cached_per_1k: Decimal,
}

/// Result of pricing one call: the costs, plus whether the fallback
/// rate had to be used because `{model, provider}` was unrecognized.
#[derive(Debug, Clone, Copy)]
pub struct Priced {
    /// Cost of the input tokens.
    pub input_cost: Decimal,
    /// Cost of the output tokens.
    pub output_cost: Decimal,
    /// `input_cost + output_cost`.
    pub total_cost: Decimal,
    /// Whether `rates` came from the fallback rather than the table.
    pub used_fallback: bool,
}

/// Maps `{model, provider}` to [`Rates`], falling back to a configured
/// rate for anything not listed.
pub struct PricingTable {
    rates: HashMap<(String, String), Rates>,
    fallback: Rates,
}

impl PricingTable {
    /// An empty table that prices every call at `fallback`.
    pub fn new(fallback: Rates) -> Self {
        Self {
            rates: HashMap::new(),
            fallback,
        }
    }

    /// A table seeded with a small set of common models, falling back
    /// to a conservative blended rate for anything else.
    pub fn with_builtin_defaults() -> Self {
        let mut table = Self::new(Rates {
            input_per_1k: Decimal::new(5, 3),
            output_per_1k: Decimal::new(15, 3),
            cached_per_1k: Decimal::new(25, 4),
        });
        table.insert(
            "gpt-4o",
            "openai",
            Rates {
                input_per_1k: Decimal::new(25, 4),
                output_per_1k: Decimal::new(1, 2),
                cached_per_1k: Decimal::new(125, 5),
            },
        );
        table.insert(
            "gpt-4o-mini",
            "openai",
            Rates {
                input_per_1k: Decimal::new(15, 5),
                output_per_1k: Decimal::new(6, 4),
                cached_per_1k: Decimal::new(75, 6),
            },
        );
        table.insert(
            "claude-3-5-sonnet",
            "anthropic",
            Rates {
                input_per_1k: Decimal::new(3, 3),
                output_per_1k: Decimal::new(15, 3),
                cached_per_1k: Decimal::new(3, 4),
            },
        );
        table
    }

    /// Register (or overwrite) the rates for one `{model, provider}` pair.
    pub fn insert(&mut self, model: impl Into<String>, provider: impl Into<String>, rates: Rates) {
        self.rates.insert((model.into(), provider.into()), rates);
    }

    /// Look up rates for `{model, provider}`, returning whether the
    /// fallback was used.
    pub fn rates_for(&self, model: &str, provider: &str) -> (Rates, bool) {
        match self.rates.get(&(model.to_string(), provider.to_string())) {
            Some(rates) => (*rates, false),
            None => (self.fallback, true),
        }
    }

    /// Price a call: `input_tokens` less `cached_tokens` at the input
    /// rate, `cached_tokens` at the cached rate, `output_tokens` at the
    /// output rate.
    pub fn price(
        &self,
        model: &str,
        provider: &str,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
    ) -> Priced {
        let (rates, used_fallback) = self.rates_for(model, provider);
        let billable_input = input_tokens.saturating_sub(cached_tokens);
        let input_cost = Decimal::from(billable_input) / Decimal::from(1000) * rates.input_per_1k
            + Decimal::from(cached_tokens) / Decimal::from(1000) * rates.cached_per_1k;
        let output_cost = Decimal::from(output_tokens) / Decimal::from(1000) * rates.output_per_1k;
        Priced {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            used_fallback,
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_builtin_defaults()
    }
}
