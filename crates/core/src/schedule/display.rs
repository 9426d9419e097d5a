use alloc::string::String;
use alloc::vec::Vec;

use crate::schedule::types::Operation;

/// Format operations as canonical schedule text, e.g. `R1(X); W1(X); C1`.
///
/// Operations are written in step order using their canonical form, so the
/// output parses back to the same operation sequence.
#[must_use]
pub fn format_schedule(operations: &[Operation]) -> String {
    let mut ordered: Vec<&Operation> = operations.iter().collect();
    ordered.sort_by_key(|op| op.step);
    ordered
        .iter()
        .map(|op| op.canonical_text())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_schedule() {
        let operations = vec![
            Operation::read(0, 1, "X"),
            Operation::write(1, 1, "X"),
            Operation::commit(2, 1),
        ];
        assert_eq!(format_schedule(&operations), "R1(X); W1(X); C1");
    }

    #[test]
    fn test_format_schedule_orders_by_step() {
        let operations = vec![Operation::abort(1, 2), Operation::write(0, 2, "Y")];
        assert_eq!(format_schedule(&operations), "W2(Y); A2");
    }

    #[test]
    fn test_format_schedule_empty() {
        assert_eq!(format_schedule(&[]), "");
    }

    #[test]
    fn test_format_schedule_ignores_original_text() {
        let operations = vec![Operation::commit(0, 3).with_text("C003".into())];
        assert_eq!(format_schedule(&operations), "C3");
    }
}
