use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{DataError, Result};

/// Ground-truth type string of the negative class.
pub const NORMAL: &str = "Normal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Anomalous,
}

impl Label {
    /// Anything other than `"Normal"` is treated as anomalous.
    pub fn from_kind(kind: &str) -> Self {
        if kind == NORMAL {
            Label::Normal
        } else {
            Label::Anomalous
        }
    }

    pub fn tag_id(self) -> i64 {
        match self {
            Label::Normal => 0,
            Label::Anomalous => 1,
        }
    }
}

/// One labelled event sequence (e.g. all log events of a block or session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub events: Vec<String>,
    /// Ground-truth type; `"Normal"` or an anomaly type.
    pub kind: String,
    /// Training tag. Pseudo-labelled data may disagree with `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    /// Probability mass the soft target puts on `label`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Instance {
    pub fn new(id: impl Into<String>, events: Vec<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            events,
            kind: kind.into(),
            label: None,
            confidence: None,
            predicted: None,
            score: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.kind == NORMAL
    }

    pub fn truth(&self) -> Label {
        Label::from_kind(&self.kind)
    }

    /// The tag used as the training target.
    pub fn tag(&self) -> Label {
        self.label.unwrap_or_else(|| self.truth())
    }

    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    /// Copy of this instance carrying a prediction.
    pub fn with_prediction(&self, predicted: Label, score: f64) -> Self {
        Self {
            predicted: Some(predicted),
            score: Some(score),
            ..self.clone()
        }
    }
}

/// Reads a JSON-lines file, skipping blank lines.
pub fn read_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<Instance>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut instances = Vec::new();

    for (i, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        if line.trim().is_empty() {
            continue;
        }
        let inst: Instance = serde_json::from_str(&line)
            .map_err(|source| DataError::Parse { line: i + 1, source })?;
        instances.push(inst);
    }

    if instances.is_empty() {
        return Err(DataError::Empty(path.display().to_string()));
    }
    Ok(instances)
}

/// Writes one instance as a single JSON line.
pub fn write_instance<W: Write>(out: &mut W, inst: &Instance) -> Result<()> {
    serde_json::to_writer(&mut *out, inst)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_non_normal_kind_is_anomalous() {
        assert_eq!(Label::from_kind("Normal"), Label::Normal);
        assert_eq!(Label::from_kind("Anomalous"), Label::Anomalous);
        assert_eq!(Label::from_kind("DiskFailure"), Label::Anomalous);
    }

    #[test]
    fn tag_falls_back_to_truth() {
        let mut inst = Instance::new("blk_1", vec!["E1".into()], "Normal");
        assert_eq!(inst.tag(), Label::Normal);
        inst.label = Some(Label::Anomalous);
        assert_eq!(inst.tag(), Label::Anomalous);
        assert_eq!(inst.truth(), Label::Normal);
    }

    #[test]
    fn reads_what_it_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        let inst = Instance::new("blk_7", vec!["E5".into(), "E9".into()], "Anomalous")
            .with_prediction(Label::Normal, 0.25);

        let mut file = File::create(&path).unwrap();
        write_instance(&mut file, &inst).unwrap();
        writeln!(file).unwrap();
        drop(file);

        let back = read_jsonl(&path).unwrap();
        assert_eq!(back, vec![inst]);
    }

    #[test]
    fn parse_errors_report_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"events\":[],\"kind\":\"Normal\"}\nnot json\n",
        )
        .unwrap();

        match read_jsonl(&path) {
            Err(DataError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(matches!(read_jsonl(&path), Err(DataError::Empty(_))));
    }
}
