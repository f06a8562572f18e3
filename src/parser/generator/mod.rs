//! # Parse-table generator
//!
//! Closes the canonical LR(1) item collection over the grammar and emits the
//! ACTION/GOTO tables. Conflicts are resolved by rule priority: the lower
//! rule index wins, and on a shift/reduce tie at equal priority the shift is
//! retained. Closure computation is memoized per item and farmed out to a
//! worker pool; state numbering is deterministic regardless of worker count
//! because states are processed breadth-first over ordered kernel sets.

mod kernel;
mod pool;

pub use kernel::Kernel;
pub use pool::WorkerPool;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::thread;

use log::debug;

use crate::ast::NodeKind;
use crate::lexer::TokenKind;

use super::grammar::{Grammar, GrammarEntry, GrammarRule};
use super::table::{Action, ParseTable};

/// Immutable grammar data shared with the closure workers.
struct GeneratorData {
    /// All rules, with the synthetic goal rule at index 0.
    rules: Vec<GrammarRule>,
    /// For each nonterminal, the indices of the rules producing it.
    node_generators: HashMap<NodeKind, Vec<usize>>,
    /// FIRST sets for every grammar entry.
    first: HashMap<GrammarEntry, BTreeSet<TokenKind>>,
}

pub struct Generator {
    data: Arc<GeneratorData>,
}

impl Generator {
    pub fn new(grammar: &Grammar) -> Self {
        let goal = GrammarRule {
            result: NodeKind::Prgm,
            components: vec![GrammarEntry::Node(NodeKind::Prgm)],
        };
        let mut rules = vec![goal];
        rules.extend(grammar.rules.iter().cloned());

        let mut node_generators: HashMap<NodeKind, Vec<usize>> = HashMap::new();
        for (index, rule) in rules.iter().enumerate().skip(1) {
            node_generators.entry(rule.result).or_default().push(index);
        }

        let mut first = HashMap::new();
        for rule in &rules {
            for entry in &rule.components {
                if !first.contains_key(entry) {
                    let set = first_of(entry, &rules, &node_generators);
                    first.insert(*entry, set);
                }
            }
        }

        Self {
            data: Arc::new(GeneratorData {
                rules,
                node_generators,
                first,
            }),
        }
    }

    /// Build the ACTION and GOTO tables.
    pub fn build(&self) -> ParseTable {
        let worker_count = thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(4)
            .min(8);
        let pool = WorkerPool::new(worker_count);
        let closures: Arc<Mutex<HashMap<Kernel, Arc<BTreeSet<Kernel>>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let initial = Kernel::new(0, 0, 0, TokenKind::EndOfFile);
        let mut states: Vec<BTreeSet<Kernel>> = vec![BTreeSet::from([initial])];
        let mut state_ids: HashMap<BTreeSet<Kernel>, usize> = HashMap::new();
        state_ids.insert(states[0].clone(), 0);

        let mut actions: Vec<HashMap<TokenKind, Action>> = vec![];
        let mut gotos: Vec<HashMap<NodeKind, usize>> = vec![];

        let mut state_index = 0;
        while state_index < states.len() {
            let kernels = states[state_index].clone();

            // Fill the closure cache for this state's kernels in parallel.
            {
                let cache = closures.lock().unwrap();
                let missing: Vec<Kernel> = kernels
                    .iter()
                    .filter(|kernel| !cache.contains_key(kernel))
                    .copied()
                    .collect();
                drop(cache);
                for kernel in missing {
                    let data = Arc::clone(&self.data);
                    let closures = Arc::clone(&closures);
                    pool.submit(move || {
                        let closed = kernel_closure(&data, kernel);
                        closures.lock().unwrap().insert(kernel, Arc::new(closed));
                    });
                }
                pool.wait();
            }

            let mut closed: BTreeSet<Kernel> = BTreeSet::new();
            {
                let cache = closures.lock().unwrap();
                for kernel in &kernels {
                    closed.extend(cache[kernel].iter().copied());
                }
            }

            let mut shifts: BTreeMap<TokenKind, BTreeSet<Kernel>> = BTreeMap::new();
            let mut shift_priorities: BTreeMap<TokenKind, usize> = BTreeMap::new();
            let mut reductions: BTreeMap<TokenKind, Kernel> = BTreeMap::new();
            let mut next_states: BTreeMap<NodeKind, BTreeSet<Kernel>> = BTreeMap::new();

            for item in &closed {
                let components = &self.data.rules[item.rule].components;
                if item.dot == components.len() {
                    let keep = match reductions.get(&item.lookahead) {
                        Some(existing) => item.priority < existing.priority,
                        None => true,
                    };
                    if keep {
                        reductions.insert(item.lookahead, *item);
                    }
                    continue;
                }
                match components[item.dot] {
                    GrammarEntry::Token(token) => {
                        shifts.entry(token).or_default().insert(item.advanced());
                        let priority = shift_priorities.entry(token).or_insert(item.priority);
                        *priority = (*priority).min(item.priority);
                    }
                    GrammarEntry::Node(node) => {
                        next_states.entry(node).or_default().insert(item.advanced());
                    }
                }
            }

            let mut action_row: HashMap<TokenKind, Action> = HashMap::new();
            let mut goto_row: HashMap<NodeKind, usize> = HashMap::new();

            for (token, kernels) in shifts {
                let id = intern_state(kernels, &mut states, &mut state_ids);
                action_row.insert(token, Action::Shift(id));
            }
            for (node, kernels) in next_states {
                let id = intern_state(kernels, &mut states, &mut state_ids);
                goto_row.insert(node, id);
            }
            for (token, item) in reductions {
                if item.rule == 0 {
                    action_row.insert(token, Action::Accept);
                    continue;
                }
                // The shift is retained when its priority is equal or lower.
                let reduce_wins = match shift_priorities.get(&token) {
                    Some(shift_priority) => *shift_priority > item.priority,
                    None => true,
                };
                if reduce_wins {
                    action_row.insert(token, Action::Reduce(item.rule - 1));
                }
            }

            actions.push(action_row);
            gotos.push(goto_row);
            state_index += 1;
        }

        debug!("parse table generated with {} states", states.len());
        ParseTable { actions, gotos }
    }
}

fn intern_state(
    kernels: BTreeSet<Kernel>,
    states: &mut Vec<BTreeSet<Kernel>>,
    state_ids: &mut HashMap<BTreeSet<Kernel>, usize>,
) -> usize {
    if let Some(id) = state_ids.get(&kernels) {
        return *id;
    }
    let id = states.len();
    states.push(kernels.clone());
    state_ids.insert(kernels, id);
    id
}

/// The set of token kinds that can begin the given grammar entry.
fn first_of(
    entry: &GrammarEntry,
    rules: &[GrammarRule],
    node_generators: &HashMap<NodeKind, Vec<usize>>,
) -> BTreeSet<TokenKind> {
    let mut tokens = BTreeSet::new();
    let mut visited: BTreeSet<NodeKind> = BTreeSet::new();
    let mut queue: Vec<GrammarEntry> = vec![*entry];
    while let Some(current) = queue.pop() {
        match current {
            GrammarEntry::Token(token) => {
                tokens.insert(token);
            }
            GrammarEntry::Node(node) => {
                if !visited.insert(node) {
                    continue;
                }
                if let Some(generators) = node_generators.get(&node) {
                    for rule in generators {
                        if let Some(head) = rules[*rule].components.first() {
                            queue.push(*head);
                        }
                    }
                }
            }
        }
    }
    tokens
}

/// The closure of a single kernel: all items reachable by expanding the
/// nonterminal after the dot, with LR(1) lookaheads.
fn kernel_closure(data: &GeneratorData, kernel: Kernel) -> BTreeSet<Kernel> {
    let mut used: BTreeSet<Kernel> = BTreeSet::from([kernel]);
    let mut queue: Vec<Kernel> = vec![kernel];
    while let Some(current) = queue.pop() {
        let components = &data.rules[current.rule].components;
        if current.dot == components.len() {
            continue;
        }
        let GrammarEntry::Node(node) = components[current.dot] else {
            continue;
        };
        let lookaheads: BTreeSet<TokenKind> = if current.dot + 1 >= components.len() {
            BTreeSet::from([current.lookahead])
        } else {
            data.first[&components[current.dot + 1]].clone()
        };
        let Some(generators) = data.node_generators.get(&node) else {
            continue;
        };
        for rule in generators {
            for lookahead in &lookaheads {
                let item = Kernel::new(*rule, *rule, 0, *lookahead);
                if used.insert(item) {
                    queue.push(item);
                }
            }
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::grammar;
    use crate::parser::table::parse_table;

    #[test]
    fn test_generator_is_deterministic() {
        let first = Generator::new(grammar()).build();
        let second = Generator::new(grammar()).build();
        assert_eq!(first, second);
    }

    #[test]
    fn test_state_zero_shifts_statement_starts() {
        let table = parse_table();
        for kind in [
            TokenKind::If,
            TokenKind::For,
            TokenKind::While,
            TokenKind::Int,
            TokenKind::IntVal,
            TokenKind::Println,
            TokenKind::Variable,
        ] {
            assert!(
                table.action(0, kind).is_some(),
                "state 0 has no action on {kind}"
            );
        }
    }

    #[test]
    fn test_no_action_on_stray_else() {
        let table = parse_table();
        assert!(table.action(0, TokenKind::Else).is_none());
    }

    #[test]
    fn test_first_of_expression_contains_literals() {
        let generator = Generator::new(grammar());
        let first = &generator.data.first[&GrammarEntry::Node(NodeKind::Expr)];
        assert!(first.contains(&TokenKind::IntVal));
        assert!(first.contains(&TokenKind::FloatVal));
        assert!(first.contains(&TokenKind::True));
        assert!(first.contains(&TokenKind::Not));
        assert!(first.contains(&TokenKind::LParen));
        assert!(first.contains(&TokenKind::Variable));
    }
}
