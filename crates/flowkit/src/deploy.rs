//! Deploying a project's contracts to a network.
//!
//! The engine plans the deployment (dependency order, imports rewritten to
//! addresses) and then walks the plan one contract at a time. Failures of
//! individual contracts are collected in the report; the run goes on with
//! the remaining contracts and nothing already on chain is rolled back.

use std::fmt;

use tracing::{info, warn};

use flow_resolver::{DeploymentPlanner, PlannedContract};
use flow_transport::Gateway;
use flow_types::{Address, Error, Identifier, Result};

use crate::config::Account;
use crate::project::Project;
use crate::transactions::TransactionBuilder;

/// Message recorded for contracts that exist and were not allowed to change.
pub const ALREADY_DEPLOYED: &str = "already deployed, use update flag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractOutcome {
    Added,
    Updated,
    /// On-chain code already matches.
    Unchanged,
    Skipped(String),
    Failed(String),
}

impl ContractOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ContractOutcome::Failed(_))
    }
}

impl fmt::Display for ContractOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractOutcome::Added => f.write_str("added"),
            ContractOutcome::Updated => f.write_str("updated"),
            ContractOutcome::Unchanged => f.write_str("unchanged"),
            ContractOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            ContractOutcome::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub target: Address,
    pub outcome: ContractOutcome,
    pub transaction_id: Option<Identifier>,
}

/// Per-contract outcomes of one run, in deployment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub network: String,
    pub contracts: Vec<DeployedContract>,
}

impl DeploymentReport {
    pub fn failed(&self) -> impl Iterator<Item = &DeployedContract> {
        self.contracts.iter().filter(|c| c.outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// The report itself, or `DeploymentFailed` naming every failed contract.
    pub fn into_result(self) -> Result<Self> {
        let failed: Vec<String> = self.failed().map(|c| c.name.clone()).collect();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(Error::DeploymentFailed { failed })
        }
    }
}

pub struct DeploymentEngine<'a> {
    gateway: &'a dyn Gateway,
    project: &'a Project,
}

impl<'a> DeploymentEngine<'a> {
    pub fn new(gateway: &'a dyn Gateway, project: &'a Project) -> Self {
        Self { gateway, project }
    }

    /// Contracts of `network` in dependency order with deploy-ready code.
    pub fn plan(&self, network: &str) -> Result<Vec<PlannedContract>> {
        if let Some(name) = self.project.conflicting_contract(network) {
            return Err(Error::AmbiguousDeployment(name));
        }

        let mut planner = DeploymentPlanner::new(self.project.aliases_for_network(network));
        for contract in self.project.contracts_by_network(network)? {
            let code = self.project.read_file(&contract.source)?;
            planner.add(contract, &code)?;
        }
        planner.plan()
    }

    /// Deploy every contract of `network`. Existing contracts are updated
    /// when `update` is set and skipped otherwise.
    pub fn deploy(&self, network: &str, update: bool) -> Result<DeploymentReport> {
        let plan = self.plan(network)?;
        info!(network, contracts = plan.len(), "deploying contracts");

        let mut report = DeploymentReport {
            network: network.to_string(),
            contracts: Vec::with_capacity(plan.len()),
        };
        for contract in &plan {
            let deployed = self.deploy_contract(contract, update)?;
            match &deployed.outcome {
                ContractOutcome::Failed(error) => {
                    warn!(contract = %deployed.name, target = %deployed.target, %error, "contract failed")
                }
                outcome => info!(contract = %deployed.name, target = %deployed.target, %outcome, "contract processed"),
            }
            report.contracts.push(deployed);
        }
        Ok(report)
    }

    fn deploy_contract(&self, contract: &PlannedContract, update: bool) -> Result<DeployedContract> {
        let account = self
            .project
            .account_by_address(contract.target)
            .ok_or_else(|| Error::MissingTargetAccount {
                contract: contract.name.clone(),
                address: contract.target.hex(),
            })?;

        let mut deployed = DeployedContract {
            name: contract.name.clone(),
            target: contract.target,
            outcome: ContractOutcome::Added,
            transaction_id: None,
        };

        let on_chain = match self.gateway.get_account(contract.target) {
            Ok(on_chain) => on_chain,
            Err(e) => {
                deployed.outcome = ContractOutcome::Failed(e.to_string());
                return Ok(deployed);
            }
        };

        let code = contract.code.as_bytes();
        let builder = match on_chain.contracts.get(&contract.name) {
            None => TransactionBuilder::add_account_contract(account.address, &contract.name, code, &contract.args)?,
            Some(_) if !update => {
                info!(contract = %contract.name, "{}", ALREADY_DEPLOYED);
                deployed.outcome = ContractOutcome::Skipped(ALREADY_DEPLOYED.to_string());
                return Ok(deployed);
            }
            Some(existing) if existing.as_slice() == code => {
                deployed.outcome = ContractOutcome::Unchanged;
                return Ok(deployed);
            }
            Some(_) => {
                deployed.outcome = ContractOutcome::Updated;
                TransactionBuilder::update_account_contract(account.address, &contract.name, code, &contract.args)?
            }
        };

        match self.submit(builder, account) {
            Ok((id, None)) => deployed.transaction_id = Some(id),
            Ok((id, Some(error))) => {
                deployed.transaction_id = Some(id);
                deployed.outcome = ContractOutcome::Failed(error);
            }
            Err(e) => deployed.outcome = ContractOutcome::Failed(e.to_string()),
        }
        Ok(deployed)
    }

    /// Sign as proposer and payer, send and wait for the seal. Returns the id
    /// and the execution error, if any.
    fn submit(
        &self,
        mut builder: TransactionBuilder,
        account: &Account,
    ) -> Result<(Identifier, Option<String>)> {
        builder
            .prepare(self.gateway, account, account.address)?
            .set_signer(account.clone())?
            .sign()?;
        let id = self.gateway.send_signed_transaction(builder.transaction())?;
        let result = self.gateway.get_transaction_result(&id, true)?;
        Ok((id, result.error))
    }
}
