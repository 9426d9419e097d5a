use chrono::{DateTime, Duration, Local};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use schedcheck_core::schedule::format_schedule;
use schedcheck_core::{Action, Operation, TransactionId};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct ScheduleParams {
    pub id: u64,
    pub n_transaction: u64,
    pub n_variable: u64,
    /// Reads and writes per transaction, not counting its commit or abort.
    pub n_operation: u64,
    /// Chance in percent that a transaction ends with an abort.
    #[builder(default)]
    pub abort_percent: u8,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GeneratedSchedule {
    params: ScheduleParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    /// Canonical text of `operations`.
    schedule: String,
    operations: Vec<Operation>,
}

impl GeneratedSchedule {
    #[must_use]
    pub fn new(
        params: ScheduleParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            schedule: format_schedule(&operations),
            operations,
        }
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub fn get_schedule(&self) -> &str {
        &self.schedule
    }

    #[must_use]
    pub fn get_operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub const fn get_params(&self) -> &ScheduleParams {
        &self.params
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Variable names `A`..`Z`, then `V26`, `V27`, ...
#[must_use]
pub fn variable_name(index: u64) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or_else(|| format!("V{index}"), |i| char::from(b'A' + i).to_string())
}

/// Generate one random schedule.
///
/// Each of the `n_transaction` transactions gets `n_operation` random reads
/// and writes over `n_variable` variables followed by a commit, or an abort
/// with probability `abort_percent`. The transactions are then interleaved
/// at random, keeping each one's own order. With no variables only the
/// terminations are generated.
#[must_use]
pub fn generate_single_schedule(params: &ScheduleParams) -> Vec<Operation> {
    let mut random_generator = rand::rng();
    let variables = Uniform::new(0, params.n_variable).ok();

    let mut pending: Vec<(TransactionId, Vec<Action>)> = (1..=params.n_transaction)
        .map(|tx| {
            let mut actions: Vec<Action> = variables
                .as_ref()
                .map(|range| {
                    (0..params.n_operation)
                        .map(|_| {
                            let variable = variable_name(range.sample(&mut random_generator));
                            if random_generator.random::<bool>() {
                                Action::Read { variable }
                            } else {
                                Action::Write { variable }
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            let abort = random_generator.random_range(0..100u8) < params.abort_percent;
            actions.push(if abort { Action::Abort } else { Action::Commit });
            // Popped from the back while interleaving.
            actions.reverse();
            (TransactionId::from(tx), actions)
        })
        .collect();

    let mut operations = Vec::new();
    while !pending.is_empty() {
        let pick = random_generator.random_range(0..pending.len());
        let (transaction, actions) = &mut pending[pick];
        if let Some(action) = actions.pop() {
            operations.push(Operation::new(operations.len(), transaction.clone(), action));
        }
        if actions.is_empty() {
            pending.swap_remove(pick);
        }
    }
    operations
}

/// Generate `n_sched` schedules in parallel, ids `0..n_sched`.
#[must_use]
pub fn generate_mult_schedules(
    n_sched: u64,
    n_transaction: u64,
    n_variable: u64,
    n_operation: u64,
    abort_percent: u8,
) -> Vec<GeneratedSchedule> {
    (0..n_sched)
        .into_par_iter()
        .map(|id| {
            let params = ScheduleParams::builder()
                .id(id)
                .n_transaction(n_transaction)
                .n_variable(n_variable)
                .n_operation(n_operation)
                .abort_percent(abort_percent)
                .build();
            let start_time = Local::now();
            let operations = generate_single_schedule(&params);
            let end_time = Local::now();
            GeneratedSchedule::new(
                params,
                "generated".to_string(),
                start_time,
                end_time,
                operations,
            )
        })
        .collect()
}
