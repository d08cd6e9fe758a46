// Federated CIFAR-100 partition - binary record reader
//
// The partition is split into train and test directories, one file per client:
//
//   root/
//     train/
//       0.bin
//       1.bin
//       ...
//     test/
//       0.bin
//       ...
//
// Each client file is a concatenation of CIFAR-100 binary records:
//
//   coarse_label(u8) | fine_label(u8) | pixels(3072 × u8)
//
// Pixels are stored channel-major (1024 red, 1024 green, 1024 blue, each
// row-major).  They are converted to [H, W, C] on load.  The client id is the
// file stem, which must be valid UTF-8.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use fedcifar_core::consts::{
    IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH, NUM_COARSE_CLASSES, NUM_FINE_CLASSES, RECORD_BYTES,
    TOTAL_FEATURE_SIZE,
};
use fedcifar_core::{Error, Result};

use crate::client_data::ClientData;
use crate::dataset::RawRecord;

/// Anything that can produce the federated `(train, test)` partition.
pub trait PartitionSource {
    /// Load both splits.
    fn load_partition(&self) -> Result<(ClientData, ClientData)>;
}

impl<T: PartitionSource + ?Sized> PartitionSource for &T {
    fn load_partition(&self) -> Result<(ClientData, ClientData)> {
        (**self).load_partition()
    }
}

/// Which split of the partition to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Directory name of the split under the partition root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

// Cifar100Dir

/// The federated partition stored on disk in CIFAR-100 binary format.
#[derive(Debug, Clone)]
pub struct Cifar100Dir {
    root: PathBuf,
}

impl Cifar100Dir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every client file of one split.
    pub fn load_split(&self, split: Split) -> Result<ClientData> {
        let dir = self.root.join(split.dir_name());
        if !dir.is_dir() {
            return Err(Error::MissingSplit(dir));
        }

        let paths = client_files(fs::read_dir(&dir)?.map(|entry| entry.map(|e| e.path())))?;

        let mut clients = ClientData::new();
        for path in &paths {
            let client_id = client_id_of(path)?;
            let bytes = fs::read(path)?;
            let records = parse_records(&bytes, path)?;
            debug!(split = split.dir_name(), client_id = %client_id, records = records.len(), "loaded client");
            clients.insert(client_id, records);
        }

        if clients.is_empty() {
            return Err(Error::EmptyPartition(split.dir_name().to_string()));
        }
        Ok(clients)
    }
}

/// Client files among the entries of a split directory, sorted by path.
/// Any failed entry aborts the walk.
fn client_files<I>(entries: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut paths = entries.into_iter().collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.is_file() && p.extension().is_some_and(|e| e == "bin"));
    paths.sort();
    Ok(paths)
}

fn client_id_of(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidClientFile(path.to_path_buf()))
}

impl PartitionSource for Cifar100Dir {
    fn load_partition(&self) -> Result<(ClientData, ClientData)> {
        let train = self.load_split(Split::Train)?;
        let test = self.load_split(Split::Test)?;
        info!(
            root = %self.root.display(),
            train_clients = train.num_clients(),
            train_examples = train.num_examples(),
            test_clients = test.num_clients(),
            test_examples = test.num_examples(),
            "loaded federated CIFAR-100 partition"
        );
        Ok((train, test))
    }
}

// SyntheticCifar100

/// A seeded, randomly generated partition with the real record layout.
///
/// Useful for tests and demos where the real partition is not on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticCifar100 {
    pub train_clients: usize,
    pub test_clients: usize,
    pub examples_per_client: usize,
    pub seed: u64,
}

impl Default for SyntheticCifar100 {
    fn default() -> Self {
        Self {
            train_clients: 8,
            test_clients: 4,
            examples_per_client: 20,
            seed: 0,
        }
    }
}

impl SyntheticCifar100 {
    pub fn new(train_clients: usize, test_clients: usize, examples_per_client: usize, seed: u64) -> Self {
        Self {
            train_clients,
            test_clients,
            examples_per_client,
            seed,
        }
    }

    fn generate(&self, num_clients: usize, rng: &mut StdRng) -> ClientData {
        let mut clients = ClientData::new();
        for client in 0..num_clients {
            let records = (0..self.examples_per_client)
                .map(|_| random_record(rng))
                .collect();
            clients.insert(client.to_string(), records);
        }
        clients
    }
}

impl PartitionSource for SyntheticCifar100 {
    fn load_partition(&self) -> Result<(ClientData, ClientData)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let train = self.generate(self.train_clients, &mut rng);
        let test = self.generate(self.test_clients, &mut rng);
        debug!(
            train_clients = train.num_clients(),
            test_clients = test.num_clients(),
            "generated synthetic CIFAR-100 partition"
        );
        Ok((train, test))
    }
}

fn random_record(rng: &mut StdRng) -> RawRecord {
    let mut image = Box::new([0u8; TOTAL_FEATURE_SIZE]);
    rng.fill(&mut image[..]);
    let label = rng.gen_range(0..NUM_FINE_CLASSES as i64);
    RawRecord {
        coarse_label: label * NUM_COARSE_CLASSES as i64 / NUM_FINE_CLASSES as i64,
        image,
        label,
    }
}

// Binary record format

/// Parse a client file into records.  `path` is only used in error messages.
pub fn parse_records(data: &[u8], path: &Path) -> Result<Vec<RawRecord>> {
    if data.len() % RECORD_BYTES != 0 {
        return Err(Error::TruncatedRecord {
            path: path.to_path_buf(),
            len: data.len(),
            record_bytes: RECORD_BYTES,
        });
    }

    let plane = IMAGE_HEIGHT * IMAGE_WIDTH;
    let mut records = Vec::with_capacity(data.len() / RECORD_BYTES);
    for chunk in data.chunks_exact(RECORD_BYTES) {
        let coarse_label = check_label(chunk[0], NUM_COARSE_CLASSES, path)?;
        let label = check_label(chunk[1], NUM_FINE_CLASSES, path)?;

        // Channel-major planes → [H, W, C]
        let planes = &chunk[2..];
        let mut image = Box::new([0u8; TOTAL_FEATURE_SIZE]);
        for p in 0..plane {
            for ch in 0..IMAGE_CHANNELS {
                image[p * IMAGE_CHANNELS + ch] = planes[ch * plane + p];
            }
        }

        records.push(RawRecord {
            coarse_label,
            image,
            label,
        });
    }
    Ok(records)
}

fn check_label(byte: u8, num_classes: usize, path: &Path) -> Result<i64> {
    if (byte as usize) < num_classes {
        Ok(byte as i64)
    } else {
        Err(Error::InvalidLabel {
            path: path.to_path_buf(),
            label: byte as i64,
            num_classes,
        })
    }
}

/// Encode records in the binary client-file format.  `path` is only used in
/// error messages.
///
/// Fails with [`Error::InvalidLabel`] if a label does not fit its class range.
pub fn encode_records(records: &[RawRecord], path: &Path) -> Result<Vec<u8>> {
    let plane = IMAGE_HEIGHT * IMAGE_WIDTH;
    let mut buf = Vec::with_capacity(records.len() * RECORD_BYTES);
    for rec in records {
        buf.push(label_byte(rec.coarse_label, NUM_COARSE_CLASSES, path)?);
        buf.push(label_byte(rec.label, NUM_FINE_CLASSES, path)?);
        for ch in 0..IMAGE_CHANNELS {
            for p in 0..plane {
                buf.push(rec.image[p * IMAGE_CHANNELS + ch]);
            }
        }
    }
    Ok(buf)
}

fn label_byte(label: i64, num_classes: usize, path: &Path) -> Result<u8> {
    match u8::try_from(label) {
        Ok(byte) if (byte as usize) < num_classes => Ok(byte),
        _ => Err(Error::InvalidLabel {
            path: path.to_path_buf(),
            label,
            num_classes,
        }),
    }
}

/// Write a split of client data under `root` in the layout read by
/// [`Cifar100Dir`].
pub fn write_split(root: impl AsRef<Path>, split: Split, clients: &ClientData) -> Result<()> {
    let dir = root.as_ref().join(split.dir_name());
    fs::create_dir_all(&dir)?;
    for id in clients.client_ids() {
        let records = clients.create_dataset_for_client(id)?;
        let path = dir.join(format!("{id}.bin"));
        let bytes = encode_records(&records, &path)?;
        fs::write(&path, bytes)?;
    }
    Ok(())
}
