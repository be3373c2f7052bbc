//! Classification of syntax tree nodes.
//!
//! Trees arrive as ESTree-shaped JSON: every node is an object with a string
//! `type`. [`TreeNode::classify`] maps each node onto a closed set of shapes
//! the populator knows how to turn into graph entities.

use serde_json::Value;

/// Declaration kinds that become `[<Kind>, Declaration]` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// `function f() {}` or a named function expression
    Function,
    /// `class C {}`
    Class,
    /// Method inside a class body
    Method,
    /// `const x = ...`
    Variable,
}

impl EntityKind {
    /// Labels for nodes of this kind, primary label first.
    pub fn labels(self) -> [&'static str; 2] {
        let primary = match self {
            EntityKind::Function => "Function",
            EntityKind::Class => "Class",
            EntityKind::Method => "Method",
            EntityKind::Variable => "Variable",
        };
        [primary, "Declaration"]
    }
}

/// One tree node, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode<'a> {
    /// Named declaration; children are contained by it
    Entity {
        /// Declaration kind
        kind: EntityKind,
        /// Declared name
        name: &'a str,
        /// 1-based source line, when the tree carries locations
        line: Option<i64>,
    },
    /// `import ... from 'source'`
    Import {
        /// Module specifier
        source: &'a str,
        /// 1-based source line
        line: Option<i64>,
    },
    /// Call with an identifier or member-expression callee
    Call {
        /// Callee text, e.g. `helper` or `console.log`
        callee: String,
        /// 1-based source line
        line: Option<i64>,
    },
    /// Any other typed node: traversed, but creates nothing
    PassThrough {
        /// The node's `type`
        node_type: &'a str,
    },
    /// Object without a string `type`; the subtree is skipped
    Skip {
        /// What was wrong with it
        reason: String,
    },
}

impl<'a> TreeNode<'a> {
    /// Classify a tree object.
    pub fn classify(node: &'a Value) -> Self {
        let Some(node_type) = node.get("type").and_then(Value::as_str) else {
            let reason = match node.get("type") {
                None => "node has no `type`".to_string(),
                Some(other) => format!("node `type` is not a string: {other}"),
            };
            return TreeNode::Skip { reason };
        };

        let line = start_line(node);
        let entity = |kind, name: Option<&'a str>| match name {
            Some(name) => TreeNode::Entity { kind, name, line },
            None => TreeNode::PassThrough { node_type },
        };

        match node_type {
            "FunctionDeclaration" | "FunctionExpression" => {
                entity(EntityKind::Function, identifier(node.get("id")))
            }
            "ClassDeclaration" => entity(EntityKind::Class, identifier(node.get("id"))),
            "MethodDefinition" => entity(EntityKind::Method, identifier(node.get("key"))),
            "VariableDeclarator" => entity(EntityKind::Variable, identifier(node.get("id"))),
            "ImportDeclaration" => match node
                .get("source")
                .and_then(|s| s.get("value"))
                .and_then(Value::as_str)
            {
                Some(source) => TreeNode::Import { source, line },
                None => TreeNode::PassThrough { node_type },
            },
            "CallExpression" => match node.get("callee").and_then(callee_name) {
                Some(callee) => TreeNode::Call { callee, line },
                None => TreeNode::PassThrough { node_type },
            },
            _ => TreeNode::PassThrough { node_type },
        }
    }
}

/// Name of an `Identifier` node.
fn identifier(node: Option<&Value>) -> Option<&str> {
    let node = node?;
    if node.get("type").and_then(Value::as_str) != Some("Identifier") {
        return None;
    }
    node.get("name").and_then(Value::as_str).filter(|n| !n.is_empty())
}

/// `helper`, `this.save`, `console.log`; `None` for computed or dynamic callees.
fn callee_name(callee: &Value) -> Option<String> {
    match callee.get("type").and_then(Value::as_str)? {
        "Identifier" => identifier(Some(callee)).map(str::to_string),
        "ThisExpression" => Some("this".to_string()),
        "MemberExpression" => {
            if callee.get("computed").and_then(Value::as_bool) == Some(true) {
                return None;
            }
            let object = callee_name(callee.get("object")?)?;
            let property = identifier(callee.get("property"))?;
            Some(format!("{object}.{property}"))
        }
        _ => None,
    }
}

fn start_line(node: &Value) -> Option<i64> {
    node.get("loc")?.get("start")?.get("line")?.as_i64()
}
