use std::fmt;

macro_rules! generate_labels {
    ($base_name:ident) => {
        OperationLabels {
            success: concat!("orderload_", stringify!($base_name), "_success"),
            error: concat!("orderload_", stringify!($base_name), "_error"),
            latency: concat!("orderload_", stringify!($base_name), "_latency"),
        }
    };
}

/// One logical call against the order API.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateOrder,
    PayOrder,
    GetOrder,
    CalculatePrice,
}

impl Operation {
    /// Candidates for the `mixed` workload.
    pub const ALL: [Operation; 4] = [
        Operation::CreateOrder,
        Operation::PayOrder,
        Operation::GetOrder,
        Operation::CalculatePrice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateOrder => "create_order",
            Operation::PayOrder => "pay_order",
            Operation::GetOrder => "get_order",
            Operation::CalculatePrice => "calculate_price",
        }
    }

    pub fn labels(&self) -> OperationLabels {
        match self {
            Operation::CreateOrder => generate_labels!(create_order),
            Operation::PayOrder => generate_labels!(pay_order),
            Operation::GetOrder => generate_labels!(get_order),
            Operation::CalculatePrice => generate_labels!(calculate_price),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metric names emitted for one [`Operation`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperationLabels {
    pub success: &'static str,
    pub error: &'static str,
    pub latency: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_prefixed() {
        let labels = Operation::PayOrder.labels();
        assert_eq!(labels.success, "orderload_pay_order_success");
        assert_eq!(labels.error, "orderload_pay_order_error");
        assert_eq!(labels.latency, "orderload_pay_order_latency");
    }

    #[test]
    fn display_uses_metric_name() {
        for operation in Operation::ALL {
            assert!(operation.labels().latency.contains(&operation.to_string()));
        }
    }
}
