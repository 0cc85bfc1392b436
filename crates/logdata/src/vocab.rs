use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::Result;
use crate::instance::{Instance, Label};

pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";
pub const PAD_ID: i64 = 0;
pub const UNK_ID: i64 = 1;

/// Event vocabulary. Ids 0 and 1 are reserved for padding and unknown events.
#[derive(Debug, Clone)]
pub struct Vocab {
    pub event_to_id: HashMap<String, i64>,
    pub id_to_event: HashMap<i64, String>,
}

impl Vocab {
    pub fn new() -> Self {
        let mut vocab = Self {
            event_to_id: HashMap::new(),
            id_to_event: HashMap::new(),
        };
        vocab.insert(PAD.to_string(), PAD_ID);
        vocab.insert(UNK.to_string(), UNK_ID);
        vocab
    }

    /// Builds the vocabulary from training data. Events seen fewer than
    /// `min_count` times map to `<unk>`. Ids are assigned in sorted order so
    /// the same data always yields the same vocabulary.
    pub fn build(instances: &[Instance], min_count: usize) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for inst in instances {
            for event in &inst.events {
                *counts.entry(event.as_str()).or_insert(0) += 1;
            }
        }

        let mut events: Vec<&str> = counts
            .into_iter()
            .filter(|(_, c)| *c >= min_count.max(1))
            .map(|(e, _)| e)
            .collect();
        events.sort_unstable();

        let mut vocab = Self::new();
        for event in events {
            if vocab.get_id(event).is_none() {
                let id = vocab.len() as i64;
                vocab.insert(event.to_string(), id);
            }
        }
        vocab
    }

    pub fn insert(&mut self, event: String, id: i64) {
        self.event_to_id.insert(event.clone(), id);
        self.id_to_event.insert(id, event);
    }

    pub fn get_id(&self, event: &str) -> Option<i64> {
        self.event_to_id.get(event).copied()
    }

    pub fn get_event(&self, id: i64) -> Option<&String> {
        self.id_to_event.get(&id)
    }

    pub fn event_id(&self, event: &str) -> i64 {
        self.get_id(event).unwrap_or(UNK_ID)
    }

    /// Encodes a sequence; an empty sequence becomes a single `<unk>` so
    /// every row has at least one attendable position.
    pub fn encode(&self, events: &[String]) -> Vec<i64> {
        if events.is_empty() {
            return vec![UNK_ID];
        }
        events.iter().map(|e| self.event_id(e)).collect()
    }

    pub fn tag_id(&self, label: Label) -> i64 {
        label.tag_id()
    }

    pub fn id_to_tag(&self, id: i64) -> Label {
        if id == Label::Anomalous.tag_id() {
            Label::Anomalous
        } else {
            Label::Normal
        }
    }

    pub fn len(&self) -> usize {
        self.event_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_to_id.is_empty()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.event_to_id)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let event_to_id: HashMap<String, i64> = serde_json::from_reader(reader)?;

        let mut id_to_event = HashMap::new();
        for (event, id) in &event_to_id {
            id_to_event.insert(*id, event.clone());
        }

        Ok(Self {
            event_to_id,
            id_to_event,
        })
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}
