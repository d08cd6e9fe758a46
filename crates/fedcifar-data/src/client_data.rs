// ClientData - per-client record collections
//
// A federated split maps opaque client ids to that client's records.  Client
// ids are kept in sorted order so iteration and pooling are deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedcifar_core::{Error, Result};

use crate::dataset::{ElementSpec, RawRecord};
use crate::pipeline::{PipelineDataset, PreprocessFn};

/// Raw records grouped by client id.
///
/// Cloning is cheap: each client's records are shared.
#[derive(Debug, Clone, Default)]
pub struct ClientData {
    clients: BTreeMap<String, Arc<[RawRecord]>>,
}

impl ClientData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(client_id, records)` pairs.  A repeated id replaces the
    /// earlier entry.
    pub fn from_clients<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<RawRecord>)>,
        S: Into<String>,
    {
        let clients = clients
            .into_iter()
            .map(|(id, records)| (id.into(), Arc::<[RawRecord]>::from(records)))
            .collect();
        Self { clients }
    }

    /// Add or replace one client.
    pub fn insert(&mut self, client_id: impl Into<String>, records: Vec<RawRecord>) {
        self.clients.insert(client_id.into(), Arc::from(records));
    }

    /// Client ids in sorted order.
    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Total number of records across all clients.
    pub fn num_examples(&self) -> usize {
        self.clients.values().map(|r| r.len()).sum()
    }

    /// Schema shared by every client's records.
    pub fn element_spec(&self) -> ElementSpec {
        ElementSpec::cifar100_raw()
    }

    /// The records of one client.
    pub fn create_dataset_for_client(&self, client_id: &str) -> Result<Arc<[RawRecord]>> {
        self.clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| Error::UnknownClient(client_id.to_string()))
    }

    /// All records pooled into one sequence, in client-id order.
    pub fn create_dataset_from_all_clients(&self) -> Arc<[RawRecord]> {
        let mut pooled = Vec::with_capacity(self.num_examples());
        for records in self.clients.values() {
            pooled.extend(records.iter().cloned());
        }
        Arc::from(pooled)
    }

    /// Attach a preprocessing pipeline to every client.
    pub fn preprocess(&self, preprocess: PreprocessFn) -> FederatedDataset {
        FederatedDataset {
            clients: self.clone(),
            preprocess,
        }
    }
}

// FederatedDataset

/// Client data whose per-client datasets come out preprocessed.
#[derive(Debug, Clone)]
pub struct FederatedDataset {
    clients: ClientData,
    preprocess: PreprocessFn,
}

impl FederatedDataset {
    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.client_ids()
    }

    pub fn num_clients(&self) -> usize {
        self.clients.num_clients()
    }

    /// The pipeline applied to every client.
    pub fn preprocess_fn(&self) -> &PreprocessFn {
        &self.preprocess
    }

    /// Schema of one preprocessed element.
    pub fn element_spec(&self) -> ElementSpec {
        self.preprocess.output_spec()
    }

    /// The raw, unprocessed client data.
    pub fn raw(&self) -> &ClientData {
        &self.clients
    }

    /// Preprocessed dataset of one client.
    pub fn dataset_for_client(&self, client_id: &str) -> Result<PipelineDataset> {
        let records = self.clients.create_dataset_for_client(client_id)?;
        Ok(self.preprocess.apply(records))
    }

    /// Preprocessed datasets of every client, in client-id order.
    pub fn datasets(&self) -> impl Iterator<Item = (&str, PipelineDataset)> + '_ {
        self.clients
            .clients
            .iter()
            .map(|(id, records)| (id.as_str(), self.preprocess.apply(records.clone())))
    }
}
