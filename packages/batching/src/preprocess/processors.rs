//! Built-in processors.

use std::collections::HashMap;

use batching_core::Job;

use super::{Processor, ProcessorError};

/// Returns its input untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProcessor;

impl Processor for IdentityProcessor {
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ProcessorError> {
        Ok(jobs)
    }
}

/// Groups balance updates by their `account` parameter.
///
/// Accounts appear in the order of their first update and each account keeps
/// its updates in submission order. Jobs without an account follow, in their
/// original order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BalanceUpdate;

impl BalanceUpdate {
    pub const ACCOUNT_PARAM: &'static str = "account";
}

impl Processor for BalanceUpdate {
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ProcessorError> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut accounts: Vec<Vec<Job>> = Vec::new();
        let mut unassigned = Vec::new();

        for job in jobs {
            let Some(account) = job.param_str(Self::ACCOUNT_PARAM).map(str::to_owned) else {
                unassigned.push(job);
                continue;
            };
            let slot = *slots.entry(account).or_insert_with(|| {
                accounts.push(Vec::new());
                accounts.len() - 1
            });
            accounts[slot].push(job);
        }

        let mut grouped: Vec<Job> = accounts.into_iter().flatten().collect();
        grouped.extend(unassigned);
        Ok(grouped)
    }
}
