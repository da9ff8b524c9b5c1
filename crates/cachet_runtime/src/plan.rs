//! Pre-planned selection trees.
//!
//! Query parsing and validation happen upstream; the executor consumes a
//! [`QueryPlan`] whose nodes name the fields to resolve.

use serde_json::Value;

/// Operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A query plan.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// The root node of the plan.
    pub root: PlanNode,
    pub operation_kind: OperationKind,
}

impl QueryPlan {
    /// Plans a query whose root fields resolve in parallel.
    pub fn query(selections: Vec<PlanNode>) -> Self {
        Self {
            root: PlanNode::Parallel(selections),
            operation_kind: OperationKind::Query,
        }
    }

    /// Plans a mutation whose root fields resolve in order.
    pub fn mutation(selections: Vec<PlanNode>) -> Self {
        Self {
            root: PlanNode::Sequence(selections),
            operation_kind: OperationKind::Mutation,
        }
    }
}

/// A node in the query plan.
#[derive(Debug, Clone)]
pub enum PlanNode {
    /// Sequential execution.
    Sequence(Vec<PlanNode>),
    /// Parallel execution.
    Parallel(Vec<PlanNode>),
    /// A field with a nested selection set.
    Field {
        field: FieldSelection,
        children: Box<PlanNode>,
    },
    /// A leaf field to resolve.
    Leaf { field: FieldSelection },
    /// An inline fragment restricted to a type.
    TypeCondition {
        type_name: String,
        node: Box<PlanNode>,
    },
    /// A node kept or dropped by `@include`/`@skip`.
    Conditional {
        condition: bool,
        node: Box<PlanNode>,
    },
}

impl PlanNode {
    /// A leaf field selection.
    pub fn leaf(name: impl Into<String>) -> Self {
        PlanNode::Leaf {
            field: FieldSelection::new(name),
        }
    }

    /// A field with sub-selections resolved in parallel.
    pub fn object(name: impl Into<String>, children: Vec<PlanNode>) -> Self {
        PlanNode::Field {
            field: FieldSelection::new(name),
            children: Box::new(PlanNode::Parallel(children)),
        }
    }

    /// An inline fragment `... on TypeName { ... }`.
    pub fn on(type_name: impl Into<String>, children: Vec<PlanNode>) -> Self {
        PlanNode::TypeCondition {
            type_name: type_name.into(),
            node: Box::new(PlanNode::Parallel(children)),
        }
    }

    /// Wraps a node in `@include(if: condition)`.
    pub fn include_if(condition: bool, node: PlanNode) -> Self {
        PlanNode::Conditional {
            condition,
            node: Box::new(node),
        }
    }

    /// Sets the alias of a field node.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(field) = self.field_mut() {
            field.alias = Some(alias.into());
        }
        self
    }

    /// Adds an argument to a field node.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(field) = self.field_mut() {
            field.arguments.push((name.into(), value.into()));
        }
        self
    }

    fn field_mut(&mut self) -> Option<&mut FieldSelection> {
        match self {
            PlanNode::Field { field, .. } | PlanNode::Leaf { field } => Some(field),
            _ => None,
        }
    }
}

/// A field as selected in the operation.
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Vec<(String, Value)>,
}

impl FieldSelection {
    /// Creates a selection of the named field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
        }
    }

    /// Returns the key under which the field appears in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Returns true for `__typename`.
    pub fn is_typename(&self) -> bool {
        self.name == "__typename"
    }
}
