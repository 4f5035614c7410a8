// Native scene file: 4 byte magic, u32 LE format version, then a bitcode encoded `SceneDocument`

use std::collections::HashSet;
use crate::{is_valid_object_name, ObjectKind};

pub const SCENE_MAGIC: [u8; 4] = *b"KSCN";
pub const SCENE_FORMAT_VERSION: u32 = 1;
pub const SCENE_FILE_EXTENSION: &str = "kscn";

const HEADER_LEN: usize = SCENE_MAGIC.len() + size_of::<u32>();

#[derive(Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct SceneNode
{
    pub name: String,
    pub kind: ObjectKind,
    pub parent: Option<u32>, // index into `SceneDocument::nodes`
}

#[derive(Debug, Default, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct SceneDocument
{
    pub saved_by: String, // engine version string
    pub nodes: Vec<SceneNode>,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneFileError
{
    #[error("file is too short to hold a scene header ({0} bytes)")]
    TooShort(usize),
    #[error("bad magic {0:02X?}")]
    BadMagic([u8; 4]),
    #[error("unsupported scene format version {0}")]
    UnsupportedVersion(u32),
    #[error("corrupt scene body: {0}")]
    Body(#[source] bitcode::Error),
    #[error("node {0} is its own ancestor")]
    CyclicParent(usize),
    #[error("node {node} has an invalid parent index {parent}")]
    DanglingParent
    {
        node: usize,
        parent: u32,
    },
    #[error("object name {0:?} is not a valid name")]
    InvalidName(String),
    #[error("object name {0:?} is used by more than one node")]
    DuplicateName(String),
}

#[must_use]
pub fn encode(document: &SceneDocument) -> Vec<u8>
{
    let body = bitcode::encode(document);
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&SCENE_MAGIC);
    bytes.extend_from_slice(&SCENE_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

pub fn decode(bytes: &[u8]) -> Result<SceneDocument, SceneFileError>
{
    if bytes.len() < HEADER_LEN
    {
        return Err(SceneFileError::TooShort(bytes.len()));
    }

    let (magic, rest) = bytes.split_at(SCENE_MAGIC.len());
    if magic != SCENE_MAGIC
    {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(SceneFileError::BadMagic(found));
    }

    let (version_bytes, body) = rest.split_at(size_of::<u32>());
    let mut version = [0u8; 4];
    version.copy_from_slice(version_bytes);
    let version = u32::from_le_bytes(version);
    if version != SCENE_FORMAT_VERSION
    {
        return Err(SceneFileError::UnsupportedVersion(version));
    }

    let document: SceneDocument = bitcode::decode(body).map_err(SceneFileError::Body)?;

    let mut names = HashSet::with_capacity(document.nodes.len());
    for scene_node in &document.nodes
    {
        if !is_valid_object_name(&scene_node.name)
        {
            return Err(SceneFileError::InvalidName(scene_node.name.clone()));
        }
        if !names.insert(scene_node.name.as_str())
        {
            return Err(SceneFileError::DuplicateName(scene_node.name.clone()));
        }
    }

    let node_count = document.nodes.len();
    for (node, scene_node) in document.nodes.iter().enumerate()
    {
        let Some(parent) = scene_node.parent else { continue; };
        if parent as usize >= node_count
        {
            return Err(SceneFileError::DanglingParent { node, parent });
        }

        // walking up more than node_count links means we're in a loop
        let mut ancestor = Some(parent);
        for _ in 0..=node_count
        {
            let Some(a) = ancestor else { break; };
            if a as usize == node
            {
                return Err(SceneFileError::CyclicParent(node));
            }
            ancestor = document.nodes.get(a as usize).and_then(|n| n.parent);
        }
    }

    Ok(document)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::Primitive;

    fn sample() -> SceneDocument
    {
        SceneDocument
        {
            saved_by: "test".to_string(),
            nodes: vec![
                SceneNode { name: "hero01_GRP".to_string(), kind: ObjectKind::Group, parent: None },
                SceneNode { name: "hero01_geo".to_string(), kind: ObjectKind::Mesh(Primitive::Sphere), parent: Some(0) },
            ],
        }
    }

    #[test]
    fn header_then_body()
    {
        let bytes = encode(&sample());
        assert_eq!(&bytes[0..4], b"KSCN");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(decode(&bytes).ok(), Some(sample()));
    }

    #[test]
    fn rejects_bad_headers()
    {
        assert!(matches!(decode(b"KSC"), Err(SceneFileError::TooShort(3))));
        assert!(matches!(decode(b"NOPE\x01\0\0\0"), Err(SceneFileError::BadMagic(m)) if &m == b"NOPE"));

        let mut bytes = encode(&sample());
        bytes[4] = 7;
        assert!(matches!(decode(&bytes), Err(SceneFileError::UnsupportedVersion(7))));
    }

    #[test]
    fn rejects_broken_hierarchies()
    {
        let mut document = sample();
        document.nodes[1].parent = Some(5);
        assert!(matches!(decode(&encode(&document)), Err(SceneFileError::DanglingParent { node: 1, parent: 5 })));

        let mut document = sample();
        document.nodes[0].parent = Some(1);
        assert!(matches!(decode(&encode(&document)), Err(SceneFileError::CyclicParent(0))));
    }

    #[test]
    fn rejects_bad_names()
    {
        let mut document = sample();
        document.nodes.push(SceneNode { name: "hero01_GRP".to_string(), kind: ObjectKind::Group, parent: None });
        assert!(matches!(decode(&encode(&document)), Err(SceneFileError::DuplicateName(n)) if n == "hero01_GRP"));

        let mut document = sample();
        document.nodes[1].name = "bad name!".to_string();
        assert!(matches!(decode(&encode(&document)), Err(SceneFileError::InvalidName(n)) if n == "bad name!"));
    }

    #[test]
    fn children_may_precede_parents()
    {
        let mut document = sample();
        document.nodes.swap(0, 1);
        document.nodes[0].parent = Some(1);
        document.nodes[1].parent = None;
        assert_eq!(decode(&encode(&document)).ok(), Some(document));
    }
}
