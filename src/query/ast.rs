use regex::Regex;
use crate::core::error::Result;

/// Predicate tree node: a leaf field test or a boolean group
#[derive(Debug, Clone)]
pub enum ConditionNode {
    Predicate(Predicate),
    Group(BoolGroup),
}

/// Leaf test against one record field
#[derive(Debug, Clone)]
pub struct Predicate {
    pub key: String,
    pub test: FieldTest,
}

/// Exactly one test per leaf
#[derive(Debug, Clone)]
pub enum FieldTest {
    Greater(i64),            // numeric strict greater-than
    ValuesIn(Vec<String>),   // exact membership, empty set never matches
    Matches(Pattern),        // unanchored regex search
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,    // negates the first child only
}

#[derive(Debug, Clone)]
pub struct BoolGroup {
    pub op: BoolOp,
    pub children: Vec<ConditionNode>,
}

/// Compiled regex together with its source text.
/// An empty source compiles to nothing and never matches.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        let regex = if source.is_empty() {
            None
        } else {
            Some(Regex::new(source)?)
        };

        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex
            .as_ref()
            .map(|re| re.is_match(haystack))
            .unwrap_or(false)
    }
}

impl Predicate {
    pub fn greater(key: impl Into<String>, value: i64) -> Self {
        Predicate { key: key.into(), test: FieldTest::Greater(value) }
    }

    pub fn values_in<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate {
            key: key.into(),
            test: FieldTest::ValuesIn(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn matches(key: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Predicate { key: key.into(), test: FieldTest::Matches(Pattern::new(pattern)?) })
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Predicate { key: key.into(), test: FieldTest::IsNull }
    }

    pub fn is_not_null(key: impl Into<String>) -> Self {
        Predicate { key: key.into(), test: FieldTest::IsNotNull }
    }
}

impl ConditionNode {
    pub fn group(op: BoolOp, children: Vec<ConditionNode>) -> Self {
        ConditionNode::Group(BoolGroup { op, children })
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        Self::group(BoolOp::And, children)
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        Self::group(BoolOp::Or, children)
    }

    pub fn not(child: ConditionNode) -> Self {
        Self::group(BoolOp::Not, vec![child])
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        match self {
            ConditionNode::Predicate(_) => 1,
            ConditionNode::Group(group) => {
                1 + group.children.iter().map(ConditionNode::size).sum::<usize>()
            }
        }
    }
}

impl From<Predicate> for ConditionNode {
    fn from(predicate: Predicate) -> Self {
        ConditionNode::Predicate(predicate)
    }
}
