use super::{Cause, Error, ErrorContext, ErrorKind, MultiError};

/// Accessors shared by [`Error`] and [`MultiError`].
pub trait TxError: std::error::Error + Send + Sync + 'static {
    fn op(&self) -> &str;
    fn kind(&self) -> Option<ErrorKind>;
    fn message(&self) -> Option<&str>;
    fn context(&self) -> &ErrorContext;
    fn causes(&self) -> Causes<'_>;
    fn as_error(&self) -> &(dyn std::error::Error + 'static);
}

/// Shape of the causes below a structured error.
#[derive(Debug, Clone, Copy)]
pub enum Causes<'a> {
    None,
    One(&'a Cause),
    Many(&'a [Cause]),
}

/// A node of an error tree: a structured error or any foreign error.
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Tx(&'a dyn TxError),
    Other(&'a (dyn std::error::Error + 'static)),
}

impl<'a> Node<'a> {
    /// Wraps a foreign error, recognizing structured errors behind `dyn Error`.
    pub fn from_std(err: &'a (dyn std::error::Error + 'static)) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            Node::Tx(err)
        } else if let Some(err) = err.downcast_ref::<MultiError>() {
            Node::Tx(err)
        } else {
            Node::Other(err)
        }
    }

    /// Operation label, empty for foreign errors.
    pub fn op(&self) -> &'a str {
        match *self {
            Node::Tx(err) => err.op(),
            Node::Other(_) => "",
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match *self {
            Node::Tx(err) => err.kind(),
            Node::Other(_) => None,
        }
    }

    pub fn message(&self) -> Option<&'a str> {
        match *self {
            Node::Tx(err) => err.message(),
            Node::Other(_) => None,
        }
    }

    pub fn as_error(&self) -> &'a (dyn std::error::Error + 'static) {
        match *self {
            Node::Tx(err) => err.as_error(),
            Node::Other(err) => err,
        }
    }

    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&'a T> {
        self.as_error().downcast_ref::<T>()
    }

    fn children(&self) -> Children<'a> {
        match *self {
            Node::Tx(err) => match err.causes() {
                Causes::None => Children::None,
                Causes::One(cause) => Children::One(cause.as_node()),
                Causes::Many(causes) => Children::Many(causes),
            },
            Node::Other(err) => match err.source() {
                Some(source) => Children::One(Node::from_std(source)),
                None => Children::None,
            },
        }
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Tx(err) => f.debug_tuple("Tx").field(&err.to_string()).finish(),
            Node::Other(err) => f.debug_tuple("Other").field(err).finish(),
        }
    }
}

enum Children<'a> {
    None,
    One(Node<'a>),
    Many(&'a [Cause]),
}

impl<'a> From<&'a Error> for Node<'a> {
    fn from(err: &'a Error) -> Self {
        Node::Tx(err)
    }
}

impl<'a> From<&'a MultiError> for Node<'a> {
    fn from(err: &'a MultiError) -> Self {
        Node::Tx(err)
    }
}

impl<'a> From<&'a Cause> for Node<'a> {
    fn from(cause: &'a Cause) -> Self {
        cause.as_node()
    }
}

impl<'a> From<&'a (dyn std::error::Error + 'static)> for Node<'a> {
    fn from(err: &'a (dyn std::error::Error + 'static)) -> Self {
        Node::from_std(err)
    }
}

/// Walks the error tree depth first, starting with `root`.
///
/// Returning `false` from `visit` stops the walk; no further node is visited,
/// sibling causes included.
pub fn iter<'a>(root: impl Into<Node<'a>>, mut visit: impl FnMut(Node<'a>) -> bool) {
    walk(root.into(), &mut visit);
}

fn walk<'a>(mut node: Node<'a>, visit: &mut impl FnMut(Node<'a>) -> bool) -> bool {
    loop {
        if !visit(node) {
            return false;
        }

        match node.children() {
            Children::None => return true,
            Children::One(next) => node = next,
            Children::Many(causes) => {
                for cause in causes {
                    if !walk(cause.as_node(), visit) {
                        return false;
                    }
                }
                return true;
            }
        }
    }
}

/// First node of the tree matching `pred`.
pub fn find_err_with<'a>(
    root: impl Into<Node<'a>>,
    mut pred: impl FnMut(Node<'a>) -> bool,
) -> Option<Node<'a>> {
    let mut found = None;
    iter(root, |node| {
        if pred(node) {
            found = Some(node);
            return false;
        }
        true
    });
    found
}

/// First node of the tree with the given kind.
pub fn find_kind<'a>(root: impl Into<Node<'a>>, kind: ErrorKind) -> Option<Node<'a>> {
    find_err_with(root, |node| node.kind() == Some(kind))
}

/// Reports whether any error in the tree has the given kind.
pub fn is<'a>(root: impl Into<Node<'a>>, kind: ErrorKind) -> bool {
    find_kind(root, kind).is_some()
}

/// Kind of the first error in the tree that has one.
pub fn get_kind<'a>(root: impl Into<Node<'a>>) -> Option<ErrorKind> {
    find_err_with(root, |node| node.kind().is_some()).and_then(|node| node.kind())
}

/// Operation label of the first error in the tree that has one.
pub fn get_op<'a>(root: impl Into<Node<'a>>) -> Option<&'a str> {
    find_err_with(root, |node| !node.op().is_empty()).map(|node| node.op())
}

/// Message of the first error in the tree that has one.
pub fn get_message<'a>(root: impl Into<Node<'a>>) -> Option<&'a str> {
    find_err_with(root, |node| node.message().is_some()).and_then(|node| node.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{raise_invalid_param, ErrorContext};
    use std::io;

    fn chain() -> Error {
        let c = Error::new("c").of(ErrorKind::TxFinished).report("tx closed");
        let b = Error::new("b").of(ErrorKind::ReadFail).caused_by(c);
        Error::new("a").caused_by(b)
    }

    fn ops<'a>(root: impl Into<Node<'a>>) -> Vec<String> {
        let mut seen = Vec::new();
        iter(root, |node| {
            seen.push(node.op().to_string());
            true
        });
        seen
    }

    #[test]
    fn test_iter_visits_chain_in_order() {
        assert_eq!(ops(&chain()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_iter_stops_on_first_node() {
        let err = chain();
        let mut visited = Vec::new();
        iter(&err, |node| {
            visited.push(node.op().to_string());
            false
        });
        assert_eq!(visited, vec!["a"]);
    }

    #[test]
    fn test_iter_multi_cause_depth_first() {
        let mut multi = MultiError::new("m");
        multi.push(Error::new("x").caused_by(Error::new("x1")));
        multi.push(Error::new("y"));
        let root = Error::new("root").caused_by(multi);

        assert_eq!(ops(&root), vec!["root", "m", "x", "x1", "y"]);
    }

    #[test]
    fn test_iter_stop_skips_siblings() {
        let mut multi = MultiError::new("m");
        multi.push(Error::new("x").caused_by(Error::new("x1")));
        multi.push(Error::new("y"));

        let mut visited = Vec::new();
        iter(&multi, |node| {
            visited.push(node.op().to_string());
            node.op() != "x"
        });
        assert_eq!(visited, vec!["m", "x"]);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("foreign wrapper")]
    struct Wrapper(#[source] Error);

    #[test]
    fn test_iter_follows_foreign_sources() {
        let inner = Error::new("inner-tx").of(ErrorKind::TxFinished);
        let root = Error::new("root").caused_by(Cause::other(Wrapper(inner)));

        assert_eq!(ops(&root), vec!["root", "", "inner-tx"]);
        assert!(is(&root, ErrorKind::TxFinished));
    }

    #[test]
    fn test_iter_from_std_error() {
        let err = io::Error::new(io::ErrorKind::Other, "disk gone");
        let root: &(dyn std::error::Error + 'static) = &err;
        assert_eq!(ops(root), vec![""]);
        assert_eq!(get_kind(root), None);
    }

    #[test]
    fn test_find_helpers() {
        let err = chain();
        assert!(is(&err, ErrorKind::TxFinished));
        assert!(is(&err, ErrorKind::ReadFail));
        assert!(!is(&err, ErrorKind::SeekFail));

        assert_eq!(get_kind(&err), Some(ErrorKind::ReadFail));
        assert_eq!(get_op(&err), Some("a"));
        assert_eq!(get_message(&err), Some("tx closed"));

        let node = find_kind(&err, ErrorKind::TxFinished).unwrap();
        assert_eq!(node.op(), "c");
        assert!(node.downcast_ref::<Error>().is_some());

        let node = find_err_with(&err, |n| n.op() == "b").unwrap();
        assert_eq!(node.kind(), Some(ErrorKind::ReadFail));
    }

    #[test]
    fn test_get_op_skips_unlabeled() {
        let err = Error::wrap(raise_invalid_param("bad").with_ctx(ErrorContext::new()));
        assert_eq!(get_op(&err), None);
        assert_eq!(get_kind(&err), Some(ErrorKind::InvalidParam));
    }
}
