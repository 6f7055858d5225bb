//! Processor chain linkage
//!
//! A [`Chain`] owns an ordered, finite sequence of stages. A [`ChainNode`]
//! is a position in that sequence and gives its stage access to the
//! immediate successor and predecessor. The linkage is fixed when the chain
//! is built; dispatch only follows it.

use crate::error::{PipelineError, PipelineResult};
use crate::interceptor::Interceptor;
use crate::invocation::Direction;
use crate::registry::RESERVED_PREFIX;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub mod builder;

pub use builder::ChainBuilder;

/// Ordered, doubly traversable sequence of stages
pub struct Chain {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    /// Link `stages` in order, head first.
    ///
    /// Stage names must be non-empty, unique within the chain and must not
    /// use the reserved prefix.
    pub fn new(stages: Vec<Arc<dyn Interceptor>>) -> PipelineResult<Self> {
        let mut seen = HashSet::new();
        for stage in &stages {
            let name = stage.name();
            if name.is_empty() {
                return Err(PipelineError::assembly("interceptor name must not be empty"));
            }
            if name.starts_with(RESERVED_PREFIX) {
                return Err(PipelineError::assembly(format!(
                    "interceptor name '{name}' uses the reserved prefix"
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(PipelineError::assembly(format!(
                    "interceptor '{name}' appears more than once in the chain"
                )));
            }
        }

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn head(&self) -> Option<ChainNode<'_>> {
        self.node(0)
    }

    pub fn tail(&self) -> Option<ChainNode<'_>> {
        self.len().checked_sub(1).and_then(|i| self.node(i))
    }

    /// Node at `position`, counted from the head
    pub fn node(&self, position: usize) -> Option<ChainNode<'_>> {
        (position < self.stages.len()).then_some(ChainNode {
            chain: self,
            position,
        })
    }

    /// Node of the stage called `name`
    pub fn find(&self, name: &str) -> Option<ChainNode<'_>> {
        self.stages
            .iter()
            .position(|s| s.name() == name)
            .and_then(|i| self.node(i))
    }

    /// Stage names, head first
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Which end of the chain a traversal ran off
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainExit {
    /// Forward travel passed the tail
    Tail,
    /// Backward travel passed the head
    Head,
}

impl ChainExit {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ChainExit::Tail,
            Direction::Backward => ChainExit::Head,
        }
    }
}

/// Neighbour of a node: another node, or the end of the chain
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    Node(ChainNode<'a>),
    Exit(ChainExit),
}

/// Position of a stage within its chain
#[derive(Clone, Copy)]
pub struct ChainNode<'a> {
    chain: &'a Chain,
    position: usize,
}

impl<'a> ChainNode<'a> {
    pub fn stage(&self) -> &'a Arc<dyn Interceptor> {
        &self.chain.stages[self.position]
    }

    pub fn name(&self) -> &'a str {
        self.stage().name()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn chain(&self) -> &'a Chain {
        self.chain
    }

    pub fn is_head(&self) -> bool {
        self.position == 0
    }

    pub fn is_tail(&self) -> bool {
        self.position + 1 == self.chain.len()
    }

    /// Following stage; past the tail this is a configuration error
    pub fn next(&self) -> PipelineResult<ChainNode<'a>> {
        match self.successor() {
            Link::Node(node) => Ok(node),
            Link::Exit(_) => Err(PipelineError::chain_boundary(
                self.name(),
                Direction::Forward,
            )),
        }
    }

    /// Preceding stage; before the head this is a configuration error
    pub fn previous(&self) -> PipelineResult<ChainNode<'a>> {
        match self.predecessor() {
            Link::Node(node) => Ok(node),
            Link::Exit(_) => Err(PipelineError::chain_boundary(
                self.name(),
                Direction::Backward,
            )),
        }
    }

    pub fn successor(&self) -> Link<'a> {
        match self.chain.node(self.position + 1) {
            Some(node) => Link::Node(node),
            None => Link::Exit(ChainExit::Tail),
        }
    }

    pub fn predecessor(&self) -> Link<'a> {
        match self.position.checked_sub(1).and_then(|i| self.chain.node(i)) {
            Some(node) => Link::Node(node),
            None => Link::Exit(ChainExit::Head),
        }
    }

    /// Neighbour in `direction`
    pub fn neighbour(&self, direction: Direction) -> Link<'a> {
        match direction {
            Direction::Forward => self.successor(),
            Direction::Backward => self.predecessor(),
        }
    }
}

impl fmt::Debug for ChainNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainNode")
            .field("name", &self.name())
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::builtin::LoggingInterceptor;

    fn chain_of(names: &[&str]) -> Chain {
        let stages = names
            .iter()
            .map(|n| Arc::new(LoggingInterceptor::new(*n)) as Arc<dyn Interceptor>)
            .collect();
        Chain::new(stages).unwrap()
    }

    #[test]
    fn test_head_and_tail() {
        let chain = chain_of(&["a", "b", "c"]);

        assert_eq!(chain.head().unwrap().name(), "a");
        assert_eq!(chain.tail().unwrap().name(), "c");
        assert!(chain.head().unwrap().is_head());
        assert!(chain.tail().unwrap().is_tail());
        assert_eq!(chain.stage_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_chain() {
        let chain = Chain::new(vec![]).unwrap();

        assert!(chain.is_empty());
        assert!(chain.head().is_none());
        assert!(chain.tail().is_none());
    }

    #[test]
    fn test_next_and_previous() {
        let chain = chain_of(&["a", "b", "c"]);
        let b = chain.find("b").unwrap();

        assert_eq!(b.next().unwrap().name(), "c");
        assert_eq!(b.previous().unwrap().name(), "a");
        assert_eq!(b.position(), 1);
    }

    #[test]
    fn test_moving_past_ends_is_an_error() {
        let chain = chain_of(&["a", "b"]);

        let past_tail = chain.tail().unwrap().next();
        assert!(matches!(
            past_tail,
            Err(PipelineError::ChainBoundary { direction: Direction::Forward, ref stage }) if stage == "b"
        ));

        let before_head = chain.head().unwrap().previous();
        assert!(matches!(
            before_head,
            Err(PipelineError::ChainBoundary { direction: Direction::Backward, .. })
        ));
    }

    #[test]
    fn test_links_report_exits() {
        let chain = chain_of(&["only"]);
        let node = chain.head().unwrap();

        assert!(matches!(node.successor(), Link::Exit(ChainExit::Tail)));
        assert!(matches!(node.predecessor(), Link::Exit(ChainExit::Head)));
        assert!(matches!(
            node.neighbour(Direction::Backward),
            Link::Exit(ChainExit::Head)
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let stages: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(LoggingInterceptor::new("a")),
            Arc::new(LoggingInterceptor::new("a")),
        ];

        assert!(matches!(Chain::new(stages), Err(PipelineError::Assembly { .. })));
    }

    #[test]
    fn test_reserved_and_empty_names_rejected() {
        let reserved: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(LoggingInterceptor::new("system:tail"))];
        assert!(Chain::new(reserved).is_err());

        let empty: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::new(""))];
        assert!(Chain::new(empty).is_err());
    }

    #[test]
    fn test_exit_for_direction() {
        assert_eq!(ChainExit::for_direction(Direction::Forward), ChainExit::Tail);
        assert_eq!(ChainExit::for_direction(Direction::Backward), ChainExit::Head);
    }
}
