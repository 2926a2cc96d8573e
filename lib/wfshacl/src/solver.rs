//! Computation of the well-founded model of a [`LogicProgram`].

use crate::error::SolverError;
use crate::program::{Atom, LogicProgram, Predicate, Rule};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use std::{io, thread};

#[allow(clippy::expect_used)]
static ATOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z][a-z0-9_]*)\(c([0-9]+)\)").expect("valid atom pattern"));

/// The three-valued well-founded model of a program.
///
/// Atoms that are neither true nor undefined are false.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WellFoundedModel {
    pub true_atoms: FxHashSet<Atom>,
    pub undefined: FxHashSet<Atom>,
}

impl WellFoundedModel {
    pub fn is_true(&self, atom: &Atom) -> bool {
        self.true_atoms.contains(atom)
    }

    pub fn is_undefined(&self, atom: &Atom) -> bool {
        self.undefined.contains(atom)
    }
}

/// Something able to compute the well-founded model of a logic program.
pub trait Solver {
    fn solve(&self, program: &LogicProgram) -> Result<WellFoundedModel, SolverError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn solve(&self, program: &LogicProgram) -> Result<WellFoundedModel, SolverError> {
        (**self).solve(program)
    }
}

/// Computes the well-founded model in process with the alternating fixpoint.
///
/// ```
/// use wfshacl::{GroundSolver, LogicProgram, Solver};
///
/// let model = GroundSolver.solve(&LogicProgram::default())?;
/// assert!(model.true_atoms.is_empty());
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundSolver;

impl Solver for GroundSolver {
    fn solve(&self, program: &LogicProgram) -> Result<WellFoundedModel, SolverError> {
        let rules = program.rules();
        let mut watchers = FxHashMap::<Atom, Vec<usize>>::default();
        for (index, rule) in rules.iter().enumerate() {
            for literal in rule.body.iter().filter(|l| !l.negated) {
                watchers.entry(literal.atom).or_default().push(index);
            }
        }

        // Underestimates of the true atoms alternate with overestimates of the non false ones
        let mut true_atoms = FxHashSet::default();
        loop {
            let possible = least_model(rules, &watchers, &true_atoms);
            let next = least_model(rules, &watchers, &possible);
            if next == true_atoms {
                let undefined = possible.difference(&true_atoms).copied().collect();
                return Ok(WellFoundedModel {
                    true_atoms,
                    undefined,
                });
            }
            true_atoms = next;
        }
    }
}

/// The least model of the reduct of `rules` with respect to `assumed`.
///
/// A negative literal holds iff its atom is not in `assumed`.
fn least_model(
    rules: &[Rule],
    watchers: &FxHashMap<Atom, Vec<usize>>,
    assumed: &FxHashSet<Atom>,
) -> FxHashSet<Atom> {
    let mut model = FxHashSet::default();
    let mut pending = Vec::with_capacity(rules.len());
    let mut queue = Vec::new();
    for rule in rules {
        let blocked = rule
            .body
            .iter()
            .any(|l| l.negated && assumed.contains(&l.atom));
        let missing = if blocked {
            usize::MAX
        } else {
            rule.body.iter().filter(|l| !l.negated).count()
        };
        if missing == 0 && model.insert(rule.head) {
            queue.push(rule.head);
        }
        pending.push(missing);
    }
    while let Some(atom) = queue.pop() {
        for index in watchers.get(&atom).into_iter().flatten() {
            let missing = &mut pending[*index];
            if *missing == usize::MAX || *missing == 0 {
                continue;
            }
            *missing -= 1;
            if *missing == 0 && model.insert(rules[*index].head) {
                queue.push(rules[*index].head);
            }
        }
    }
    model
}

/// Runs an external solver reading the program on its standard input.
///
/// The solver output lists the atoms of the model. Atoms are read anywhere on a line, those
/// after a `True:` line are true and those after an `Undefined:` line are undefined.
/// Atoms before any such line are true.
/// The process is killed if it does not terminate within the timeout.
#[derive(Debug, Clone)]
#[must_use]
pub struct SubprocessSolver {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl SubprocessSolver {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a wall clock limit to the solver execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn io_error(&self, source: io::Error) -> SolverError {
        SolverError::Io {
            command: self.command.clone(),
            source,
        }
    }
}

impl Solver for SubprocessSolver {
    fn solve(&self, program: &LogicProgram) -> Result<WellFoundedModel, SolverError> {
        let mut child = ChildGuard(
            Command::new(&self.command)
                .args(&self.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| self.io_error(e))?,
        );
        tracing::debug!("Started solver {} ({})", self.command, child.0.id());

        // Pipes are served by threads so that a chatty solver never blocks on a full pipe
        let input = program.to_string();
        let stdin = child.0.stdin.take();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Ok(()),
        });
        let stdout = reader(child.0.stdout.take());
        let stderr = reader(child.0.stderr.take());

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.0.try_wait().map_err(|e| self.io_error(e))? {
                break status;
            }
            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    return Err(SolverError::Timeout {
                        command: self.command.clone(),
                        timeout,
                    });
                }
            }
            thread::sleep(Duration::from_millis(10));
        };

        let joined = |handle: thread::JoinHandle<io::Result<Vec<u8>>>| {
            handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("The pipe reader panicked")))
        };
        let stdout = joined(stdout).map_err(|e| self.io_error(e))?;
        let stderr = joined(stderr).map_err(|e| self.io_error(e))?;
        match writer.join() {
            Ok(Ok(())) => (),
            // The solver may legitimately stop reading early
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => (),
            Ok(Err(e)) => return Err(self.io_error(e)),
            Err(_) => return Err(self.io_error(io::Error::other("The pipe writer panicked"))),
        }
        if !status.success() {
            return Err(SolverError::Failed {
                command: self.command.clone(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        parse_model(&String::from_utf8_lossy(&stdout), program)
    }
}

fn reader(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

/// Kills the child process if it is still running when dropped.
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if matches!(self.0.try_wait(), Ok(None)) {
            if let Err(error) = self.0.kill().and_then(|()| self.0.wait()) {
                tracing::warn!("Failed to stop the solver process {}: {error}", self.0.id());
            }
        }
    }
}

/// Reads the model printed by a solver.
pub fn parse_model(output: &str, program: &LogicProgram) -> Result<WellFoundedModel, SolverError> {
    let mut model = WellFoundedModel::default();
    let mut undefined = false;
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("true:") {
            undefined = false;
            continue;
        }
        if trimmed.eq_ignore_ascii_case("undefined:") {
            undefined = true;
            continue;
        }
        for captures in ATOM.captures_iter(line) {
            let text = &captures[0];
            let unknown = || SolverError::UnknownAtom(text.to_owned());
            let name = &captures[1];
            let index = |prefix: char| {
                name.strip_prefix(prefix)
                    .and_then(|i| i.parse::<usize>().ok())
            };
            let predicate = if let Some(i) = index('s') {
                Predicate::Shape(i)
            } else if let Some(k) = index('a') {
                Predicate::Aux(k)
            } else {
                return Err(unknown());
            };
            let constant = captures[2].parse::<usize>().map_err(|_| unknown())?;
            let atom = Atom::new(predicate, constant);
            if !program.contains(&atom) {
                return Err(unknown());
            }
            if undefined {
                model.undefined.insert(atom);
            } else {
                model.true_atoms.insert(atom);
            }
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::BodyLiteral;

    fn atom(predicate: Predicate, constant: usize) -> Atom {
        Atom::new(predicate, constant)
    }

    fn rules_model(rules: Vec<Rule>) -> WellFoundedModel {
        GroundSolver
            .solve(&LogicProgram::from_rules(4, 1, 0, rules))
            .unwrap()
    }

    #[test]
    fn test_mutual_negation_is_undefined() {
        let a = atom(Predicate::Shape(0), 0);
        let b = atom(Predicate::Shape(1), 0);
        let model = rules_model(vec![
            Rule {
                head: a,
                body: vec![BodyLiteral::negative(b)],
            },
            Rule {
                head: b,
                body: vec![BodyLiteral::negative(a)],
            },
        ]);
        assert!(model.true_atoms.is_empty());
        assert!(model.is_undefined(&a));
        assert!(model.is_undefined(&b));
    }

    #[test]
    fn test_stratified_negation() {
        let a = atom(Predicate::Shape(0), 0);
        let b = atom(Predicate::Shape(1), 0);
        let c = atom(Predicate::Shape(2), 0);
        let d = atom(Predicate::Shape(3), 0);
        let model = rules_model(vec![
            Rule::fact(a),
            Rule {
                head: b,
                body: vec![BodyLiteral::negative(a)],
            },
            Rule {
                head: c,
                body: vec![BodyLiteral::negative(b), BodyLiteral::positive(a)],
            },
            // Positive loops are false
            Rule {
                head: d,
                body: vec![BodyLiteral::positive(d)],
            },
        ]);
        assert!(model.is_true(&a));
        assert!(!model.is_true(&b) && !model.is_undefined(&b));
        assert!(model.is_true(&c));
        assert!(!model.is_true(&d) && !model.is_undefined(&d));
    }

    #[test]
    fn test_self_negation() {
        // p :- ~p. leaves p undefined and q :- p. undefined too
        let p = atom(Predicate::Shape(0), 0);
        let q = atom(Predicate::Shape(1), 0);
        let model = rules_model(vec![
            Rule {
                head: p,
                body: vec![BodyLiteral::negative(p)],
            },
            Rule {
                head: q,
                body: vec![BodyLiteral::positive(p)],
            },
        ]);
        assert!(model.is_undefined(&p));
        assert!(model.is_undefined(&q));
    }

    #[test]
    fn test_parse_model() {
        let program = LogicProgram::from_rules(2, 3, 1, Vec::new());
        let model = parse_model(
            "s0(c0) s1(c2)\nTrue:\na0(c1).\nUndefined:\ns1(c1)\n",
            &program,
        )
        .unwrap();
        assert_eq!(model.true_atoms.len(), 3);
        assert!(model.is_true(&atom(Predicate::Aux(0), 1)));
        assert!(model.is_undefined(&atom(Predicate::Shape(1), 1)));

        assert!(matches!(
            parse_model("s5(c0)", &program),
            Err(SolverError::UnknownAtom(atom)) if atom == "s5(c0)"
        ));
        assert!(matches!(
            parse_model("p(c0)", &program),
            Err(SolverError::UnknownAtom(_))
        ));
    }

    #[test]
    fn test_missing_solver() {
        let solver = SubprocessSolver::new("wfshacl-solver-that-does-not-exist");
        assert!(matches!(
            solver.solve(&LogicProgram::default()),
            Err(SolverError::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_subprocess_solver() {
        // `cat` echoes the facts of the program as its true atoms
        let program =
            LogicProgram::from_rules(1, 2, 0, vec![Rule::fact(atom(Predicate::Shape(0), 1))]);
        let model = SubprocessSolver::new("cat")
            .with_timeout(Duration::from_secs(10))
            .solve(&program)
            .unwrap();
        assert!(model.is_true(&atom(Predicate::Shape(0), 1)));
    }

    #[cfg(unix)]
    #[test]
    fn test_subprocess_timeout() {
        let solver = SubprocessSolver::new("sleep")
            .with_args(["10"])
            .with_timeout(Duration::from_millis(100));
        assert!(matches!(
            solver.solve(&LogicProgram::default()),
            Err(SolverError::Timeout { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_subprocess_failure() {
        assert!(matches!(
            SubprocessSolver::new("false").solve(&LogicProgram::default()),
            Err(SolverError::Failed { .. })
        ));
    }
}
