//! Compiled form of a node path

/// How the namespace part of a name test is matched
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceTest {
    /// No prefix: the document's default namespace, or none if it has none
    Unqualified,
    /// `prefix:local`, resolved against the document's namespace map
    Prefix(String),
    /// `{uri}local`
    Uri(String),
    /// `{}local`
    NoNamespace,
    /// `{*}local`
    Any,
}

/// Element or attribute name test
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Wildcard,
    Name {
        namespace: NamespaceTest,
        local: String,
    },
}

/// Position inside a group of same-named siblings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// `[n]`, 1-based
    Index(usize),
    /// `[last()]` is `FromLast(0)`, `[last()-n]` is `FromLast(n)`
    FromLast(usize),
}

/// Filter applied to the nodes selected so far
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// `[@attr]`
    HasAttribute(NameTest),
    /// `[@attr='v']`, or `[@attr!='v']` when `negated`
    AttributeEquals {
        name: NameTest,
        value: String,
        negated: bool,
    },
    /// `[tag]`
    HasChild(NameTest),
    /// `[tag='v']`, or `[tag!='v']` when `negated`
    ChildTextEquals {
        name: NameTest,
        value: String,
        negated: bool,
    },
    /// `[.='v']`, or `[.!='v']` when `negated`
    TextEquals { value: String, negated: bool },
    /// `[n]`, `[last()]`, `[last()-n]`
    Position(Position),
}

/// One step of a node path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// `.`
    SelfNode,
    /// `tag` or `*`
    Child(NameTest),
    /// `//tag` or `//*`
    Descendant(NameTest),
    /// `..`
    Parent,
    /// `[...]`
    Filter(Predicate),
}
