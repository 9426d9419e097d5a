/// DSL macros for building test schedules.
///
/// Produces `Vec<Operation>` with steps assigned in order.
///
/// # Syntax
///
/// ```ignore
/// schedule![r(1, X), w(2, X), c(1), a(2)]
/// ```
///
/// - `r(tx, var)` → read of `var` by `T{tx}`
/// - `w(tx, var)` → write of `var` by `T{tx}`
/// - `c(tx)`      → commit of `T{tx}`
/// - `a(tx)`      → abort of `T{tx}`
///
/// Build a single `(transaction, Action)` pair.
#[macro_export]
macro_rules! act {
    (r($tx:literal, $var:ident)) => {
        (
            $tx as u64,
            schedcheck_core::Action::Read {
                variable: stringify!($var).into(),
            },
        )
    };
    (w($tx:literal, $var:ident)) => {
        (
            $tx as u64,
            schedcheck_core::Action::Write {
                variable: stringify!($var).into(),
            },
        )
    };
    (c($tx:literal)) => {
        ($tx as u64, schedcheck_core::Action::Commit)
    };
    (a($tx:literal)) => {
        ($tx as u64, schedcheck_core::Action::Abort)
    };
}

/// Build a schedule from a comma-separated list of actions.
#[macro_export]
macro_rules! schedule {
    ($($e:ident($($args:tt)*)),* $(,)?) => {
        $crate::common::build(vec![$($crate::act!($e($($args)*))),*])
    };
}

pub fn build(actions: Vec<(u64, schedcheck_core::Action)>) -> Vec<schedcheck_core::Operation> {
    actions
        .into_iter()
        .enumerate()
        .map(|(step, (tx, action))| {
            schedcheck_core::Operation::new(step, schedcheck_core::TransactionId::from(tx), action)
        })
        .collect()
}
