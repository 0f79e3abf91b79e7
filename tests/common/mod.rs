/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! A small two-player game tree used to drive the search in tests.
#![allow(dead_code)]

use std::fmt;

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use pruner::{DrawReason, Evaluate, Rules, Score};

/// One of the two players in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

/// The index of a child in its parent's child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Branch(pub usize);

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Describes a tree to build with [`Tree::new`].
#[derive(Debug, Clone)]
pub enum Shape {
    /// A position with no moves, worth the given amount to [`Side::First`].
    Leaf(i32),

    /// A position with moves, worth the given amount to [`Side::First`] if the search stops here.
    Node(i32, Vec<Shape>),

    /// The side to move is checkmated.
    Mated,

    /// The game is drawn.
    Drawn,
}

/// Shorthand for an interior node with a static value of 0.
pub fn node(children: Vec<Shape>) -> Shape {
    Shape::Node(0, children)
}

/// Shorthand for a list of leaves.
pub fn leaves(values: &[i32]) -> Vec<Shape> {
    values.iter().copied().map(Shape::Leaf).collect()
}

#[derive(Debug, Clone)]
struct Vertex {
    value: i32,
    children: Vec<usize>,
    mated: bool,
    drawn: bool,
}

/// Something the search did to a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Apply(usize),
    Undo(usize),
}

/// An explicit game tree. [`Side::First`] moves at the root.
#[derive(Debug, Clone)]
pub struct Tree {
    vertices: Vec<Vertex>,

    /// Vertices from the root down to the current position.
    path: Vec<usize>,

    /// Moving into this vertex fails.
    poisoned: Option<usize>,

    /// Every successful apply and undo, in order.
    pub events: Vec<Event>,
}

impl Tree {
    /// Builds the tree described by `shape`.
    pub fn new(shape: Shape) -> Self {
        let mut vertices = Vec::new();
        build(&shape, &mut vertices);

        Self {
            vertices,
            path: vec![0],
            poisoned: None,
            events: Vec::new(),
        }
    }

    /// A complete tree where every interior node has `branching` children.
    ///
    /// Static values are drawn uniformly from `[-1000, 1000]` by a generator seeded with `seed`.
    pub fn uniform(branching: usize, height: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(uniform_shape(branching, height, &mut rng))
    }

    /// Makes moving into the vertex reached by `path` (from the root) fail.
    pub fn poison(&mut self, path: &[usize]) {
        let mut vertex = 0;
        for &branch in path {
            vertex = self.vertices[vertex].children[branch];
        }
        self.poisoned = Some(vertex);
    }

    /// Number of moves played from the root.
    pub fn ply(&self) -> usize {
        self.path.len() - 1
    }

    /// Number of vertices reachable from the root within `depth` moves.
    pub fn count_within(&self, depth: usize) -> u64 {
        count_within(&self.vertices, 0, depth)
    }

    /// Exhaustive minimax over the raw tree, for positions without mates or draws.
    ///
    /// Returns the score of every root move from [`Side::First`]'s point of view.
    pub fn reference_scores(&self, depth: usize) -> Vec<i32> {
        self.vertices[0]
            .children
            .iter()
            .map(|&child| reference(&self.vertices, child, depth - 1, false))
            .collect()
    }

    /// Returns `true` if every apply was matched by an undo, in stack order.
    pub fn is_balanced(&self) -> bool {
        let mut stack = Vec::new();
        for event in &self.events {
            match *event {
                Event::Apply(v) => stack.push(v),
                Event::Undo(v) => {
                    if stack.pop() != Some(v) {
                        return false;
                    }
                }
            }
        }
        stack.is_empty()
    }

    fn current(&self) -> &Vertex {
        &self.vertices[*self.path.last().unwrap()]
    }
}

fn build(shape: &Shape, vertices: &mut Vec<Vertex>) -> usize {
    let id = vertices.len();
    vertices.push(Vertex {
        value: 0,
        children: Vec::new(),
        mated: false,
        drawn: false,
    });

    match shape {
        Shape::Leaf(value) => vertices[id].value = *value,
        Shape::Node(value, children) => {
            vertices[id].value = *value;
            let children = children.iter().map(|c| build(c, vertices)).collect();
            vertices[id].children = children;
        }
        Shape::Mated => vertices[id].mated = true,
        Shape::Drawn => vertices[id].drawn = true,
    }

    id
}

fn uniform_shape(branching: usize, height: usize, rng: &mut StdRng) -> Shape {
    let value = rng.gen_range(-1000..=1000);
    if height == 0 {
        Shape::Leaf(value)
    } else {
        let children = (0..branching)
            .map(|_| uniform_shape(branching, height - 1, rng))
            .collect();
        Shape::Node(value, children)
    }
}

fn count_within(vertices: &[Vertex], v: usize, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    1 + vertices[v]
        .children
        .iter()
        .map(|&c| count_within(vertices, c, depth - 1))
        .sum::<u64>()
}

fn reference(vertices: &[Vertex], v: usize, depth: usize, maximizing: bool) -> i32 {
    let vertex = &vertices[v];
    if depth == 0 || vertex.children.is_empty() {
        return vertex.value;
    }

    let scores = vertex
        .children
        .iter()
        .map(|&c| reference(vertices, c, depth - 1, !maximizing));

    if maximizing {
        scores.max().unwrap()
    } else {
        scores.min().unwrap()
    }
}

impl Rules for Tree {
    type Move = Branch;
    type Side = Side;

    fn side_to_move(&self) -> Side {
        if self.ply() % 2 == 0 {
            Side::First
        } else {
            Side::Second
        }
    }

    fn legal_moves(&self) -> Vec<Branch> {
        (0..self.current().children.len()).map(Branch).collect()
    }

    fn apply_move(&mut self, mv: Branch) -> Result<()> {
        let Some(&child) = self.current().children.get(mv.0) else {
            bail!("{mv} is not a move at ply {}", self.ply());
        };
        if self.poisoned == Some(child) {
            bail!("refusing to play {mv} at ply {}", self.ply());
        }

        self.path.push(child);
        self.events.push(Event::Apply(child));
        Ok(())
    }

    fn undo_move(&mut self) -> Result<()> {
        if self.path.len() == 1 {
            bail!("nothing to undo");
        }

        let child = self.path.pop().unwrap();
        self.events.push(Event::Undo(child));
        Ok(())
    }

    fn is_checkmate(&self) -> bool {
        self.current().mated
    }

    fn draw_reason(&self) -> Option<DrawReason> {
        self.current().drawn.then_some(DrawReason::Repetition)
    }
}

/// Reads a [`Tree`]'s stored values, which are from [`Side::First`]'s point of view.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeEval;

impl Evaluate<Tree> for TreeEval {
    fn evaluate(&self, position: &Tree, perspective: Side) -> Score {
        let value = position.current().value;
        match perspective {
            Side::First => Score(value),
            Side::Second => Score(-value),
        }
    }
}
