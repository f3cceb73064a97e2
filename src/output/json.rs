//! JSON output formatting

use std::io;

use crate::tree::TreeNode;

pub fn to_json(node: &TreeNode) -> io::Result<String> {
    serde_json::to_string_pretty(node).map_err(io::Error::other)
}

/// Print tree node as pretty-printed JSON to stdout.
pub fn print_json(node: &TreeNode) -> io::Result<()> {
    println!("{}", to_json(node)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let tree = TreeNode::dir("root", "", vec![TreeNode::file("a.rs", "a.rs")]);
        let value: serde_json::Value = serde_json::from_str(&to_json(&tree).unwrap()).unwrap();
        assert_eq!(value["type"], "dir");
        assert_eq!(value["children"][0]["type"], "file");
        assert_eq!(value["children"][0]["path"], "a.rs");
    }
}
