//! Running one locked module over many input sets.
use crate::error::Result;
use crate::graph::SubmoduleGraph;
use crate::module::Module;
use crate::property_type::PropertyType;
use rayon::prelude::*;
use tracing::debug;

impl Module {
    /// Runs the module as `P` once per input set, in parallel on the rayon
    /// pool when `parallel` is set. A ready module is locked once up front;
    /// results come back in input order, each with its own outcome.
    ///
    /// Fails as a whole only if the submodule graph is cyclic.
    pub fn run_batch_as<P: PropertyType>(
        &self,
        batch: Vec<P::Inputs>,
        parallel: bool,
    ) -> Result<Vec<Result<P::Results>>> {
        SubmoduleGraph::collect(self).check_acyclic()?;
        if self.not_ready_unchecked(&P::info()).is_empty() {
            self.lock_unchecked();
        }
        debug!(module = %self.name(), property_type = P::name(), size = batch.len(), parallel, "batch run");

        let results = if parallel {
            batch.into_par_iter().map(|inputs| self.run_as::<P>(inputs)).collect()
        } else {
            batch.into_iter().map(|inputs| self.run_as::<P>(inputs)).collect()
        };
        Ok(results)
    }
}
