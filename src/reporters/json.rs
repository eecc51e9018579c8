//! JSON reporter
//!
//! Outputs the full RepositoryData document as pretty-printed JSON, the
//! format the visualization front-end loads.

use crate::models::RepositoryData;
use anyhow::Result;

/// Render the document as JSON
pub fn render(data: &RepositoryData) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EdgeKind, FileNode, NodeRecord, Relationship};

    #[test]
    fn test_json_render_valid() {
        let mut data = RepositoryData::default();
        data.metadata.repo_name = "demo".into();
        data.files.push(NodeRecord::File(FileNode::file("a.py").with_size(3)));
        data.relationships.push(Relationship {
            source: "a.py".into(),
            target: "b.py".into(),
            kind: EdgeKind::Import,
            strength: Some(2.0),
            metadata: None,
        });

        let json_str = render(&data).expect("render JSON");
        assert!(json_str.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["metadata"]["repoName"], "demo");
        assert_eq!(parsed["files"][0]["type"], "file");
        assert_eq!(parsed["relationships"][0]["strength"], 2.0);
        assert!(parsed["history"].is_null());
    }
}
