use prometheus::{opts, CounterVec, IntCounter, Registry, TextEncoder};
use viaro_core::ReservationError;

/// Prometheus counters for the reservation API.
///
/// Write operations are counted per outcome so dashboards can separate
/// business rejections (conflicts, validation) from infrastructure trouble.
pub struct Metrics {
    registry: Registry,
    operations: CounterVec,
    holds_released: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations = CounterVec::new(
            opts!(
                "viaro_operations_total",
                "Reservation operations by outcome"
            ),
            &["operation", "outcome"],
        )?;
        let holds_released = IntCounter::new(
            "viaro_holds_released_total",
            "Expired seat holds released by sweeps",
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(holds_released.clone()))?;

        Ok(Self {
            registry,
            operations,
            holds_released,
        })
    }

    /// Record one engine call. Successful calls count as `ok`; failures are
    /// labelled with their coarse error kind.
    pub fn observe<T>(&self, operation: &str, result: &Result<T, ReservationError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => err.kind().as_str(),
        };
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn add_released_holds(&self, count: u32) {
        self.holds_released.inc_by(u64::from(count));
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_labelled_by_error_kind() {
        let metrics = Metrics::new().unwrap();

        metrics.observe("hold", &Ok::<u32, ReservationError>(2));
        metrics.observe(
            "book",
            &Err::<u32, _>(ReservationError::PaymentNotCompleted),
        );

        let exported = metrics.export().unwrap();
        assert!(exported.contains("operation=\"hold\",outcome=\"ok\""));
        assert!(exported.contains("operation=\"book\",outcome=\"precondition_failed\""));
    }

    #[test]
    fn released_holds_accumulate() {
        let metrics = Metrics::new().unwrap();

        metrics.add_released_holds(3);
        metrics.add_released_holds(1);

        let exported = metrics.export().unwrap();
        assert!(exported.contains("viaro_holds_released_total 4"));
    }
}
