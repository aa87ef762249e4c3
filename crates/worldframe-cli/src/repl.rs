//! REPL – interactive queries against a loaded scene.
//!
//! Supported slash-commands:
//!   /help               – show this list
//!   /frames             – list registered frames
//!   /view <name>        – switch between commanded, measured and static
//!   /path A B           – shortest relation path from A to B
//!   /tf A B             – transformation of B relative to A
//!   /twist A B          – twist of B relative to A
//!   /connected A        – frames reachable from A
//!   /quit | /exit       – leave
//!
//! Frame names containing spaces are quoted: `/tf "World origin" table`.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;
use worldframe_geometry::{Transformation, Twist, Vector};
use worldframe_types::FrameId;
use worldframe_world::{FrameStore, NamedFrameStore, RelationKind, Topology, World};

use crate::config::ViewChoice;
use crate::scene::Scene;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Frames,
    View(ViewChoice),
    Path(String, String),
    Tf(String, String),
    Twist(String, String),
    Connected(String),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let words = split_args(line)?;
        let Some((head, args)) = words.split_first() else {
            return Err("empty command".to_string());
        };
        let expect = |n: usize, usage: &str| {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("usage: {usage}"))
            }
        };
        match head.as_str() {
            "/help" => Ok(Self::Help),
            "/frames" => Ok(Self::Frames),
            "/view" => {
                expect(1, "/view <commanded|measured|static>")?;
                Ok(Self::View(args[0].parse()?))
            }
            "/path" => {
                expect(2, "/path <from> <to>")?;
                Ok(Self::Path(args[0].clone(), args[1].clone()))
            }
            "/tf" => {
                expect(2, "/tf <from> <to>")?;
                Ok(Self::Tf(args[0].clone(), args[1].clone()))
            }
            "/twist" => {
                expect(2, "/twist <reference> <moving>")?;
                Ok(Self::Twist(args[0].clone(), args[1].clone()))
            }
            "/connected" => {
                expect(1, "/connected <frame>")?;
                Ok(Self::Connected(args[0].clone()))
            }
            "/quit" | "/exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{other}'. Type /help for available commands.")),
        }
    }
}

/// Split on whitespace, keeping double-quoted runs together.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for ch in line.trim().chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if pending {
        words.push(current);
    }
    Ok(words)
}

/// What a command produced.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Lines(Vec<String>),
    Quit,
}

/// A loaded world plus the current view.
pub struct Session {
    world: World,
    store: NamedFrameStore,
    view: ViewChoice,
    topology: Topology,
    precision: usize,
}

impl Session {
    pub fn new(scene: Scene, view: ViewChoice, precision: usize) -> Self {
        Self {
            world: scene.world,
            store: scene.store,
            view,
            topology: view.topology(),
            precision,
        }
    }

    pub fn view(&self) -> ViewChoice {
        self.view
    }

    fn lookup(&self, name: &str) -> Result<FrameId, String> {
        self.store
            .get_frame(name)
            .or_else(|| self.world.frame_by_name(name).map(|f| f.id()))
            .ok_or_else(|| format!("unknown frame '{name}'"))
    }

    fn name_of(&self, frame: FrameId) -> String {
        self.world
            .frame(frame)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| frame.to_string())
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply, String> {
        let lines = match command {
            Command::Help => help_lines(),
            Command::Frames => self.frames(),
            Command::View(view) => {
                self.view = view;
                self.topology = view.topology();
                info!(%view, "view changed");
                vec![format!("view: {view}")]
            }
            Command::Path(from, to) => self.path(&from, &to)?,
            Command::Tf(from, to) => self.transformation(&from, &to)?,
            Command::Twist(reference, moving) => self.twist(&reference, &moving)?,
            Command::Connected(frame) => self.connected(&frame)?,
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Lines(lines))
    }

    fn frames(&self) -> Vec<String> {
        self.store
            .iter()
            .map(|(name, id)| {
                let degree = self.topology.degree(&self.world, id);
                format!("{name} ({id}, {degree} visible relation(s))")
            })
            .collect()
    }

    fn path(&self, from: &str, to: &str) -> Result<Vec<String>, String> {
        let (from_id, to_id) = (self.lookup(from)?, self.lookup(to)?);
        let frame = self.world.frame(from_id).ok_or_else(|| format!("unknown frame '{from}'"))?;
        let path = frame
            .relations_to(to_id, &self.topology)
            .ok_or_else(|| format!("no path from '{from}' to '{to}' in the {} view", self.view))?;
        if path.is_empty() {
            return Ok(vec!["(same frame)".to_string()]);
        }
        Ok(path
            .iter()
            .filter_map(|id| self.world.relation(*id))
            .map(|relation| {
                format!(
                    "{} -> {} [{}] ({})",
                    self.name_of(relation.from()),
                    self.name_of(relation.to()),
                    kind_label(relation.kind()),
                    relation.id()
                )
            })
            .collect())
    }

    fn transformation(&self, from: &str, to: &str) -> Result<Vec<String>, String> {
        let (from_id, to_id) = (self.lookup(from)?, self.lookup(to)?);
        let frame = self.world.frame(from_id).ok_or_else(|| format!("unknown frame '{from}'"))?;
        let t = frame
            .transformation_to(to_id, &self.topology)
            .map_err(|e| e.to_string())?;
        Ok(format_transformation(&t, self.precision))
    }

    fn twist(&self, reference: &str, moving: &str) -> Result<Vec<String>, String> {
        let (reference_id, moving_id) = (self.lookup(reference)?, self.lookup(moving)?);
        let frame = self
            .world
            .frame(reference_id)
            .ok_or_else(|| format!("unknown frame '{reference}'"))?;
        let velocity = frame
            .velocity_of(moving_id, &self.topology)
            .map_err(|e| e.to_string())?;
        Ok(format_twist(velocity.twist(), self.precision))
    }

    fn connected(&self, name: &str) -> Result<Vec<String>, String> {
        let id = self.lookup(name)?;
        let frame = self.world.frame(id).ok_or_else(|| format!("unknown frame '{name}'"))?;
        let reached = frame.connected_frames(&self.topology);
        if reached.is_empty() {
            return Ok(vec!["(none)".to_string()]);
        }
        Ok(reached.into_iter().map(|f| self.name_of(f)).collect())
    }
}

fn kind_label(kind: &RelationKind) -> &'static str {
    match kind {
        RelationKind::Static(_) => "static",
        RelationKind::Dynamic { .. } => "dynamic",
        RelationKind::Observation(_) => "observation",
        RelationKind::Logical { .. } => "logical",
    }
}

/// Fixed-point text with the sign dropped from values that round to zero.
fn fixed(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    match text.strip_prefix('-') {
        Some(unsigned) if unsigned.chars().all(|c| c == '0' || c == '.') => unsigned.to_string(),
        _ => text,
    }
}

fn format_vector(v: &Vector, precision: usize) -> String {
    format!(
        "[{}, {}, {}]",
        fixed(v.x, precision),
        fixed(v.y, precision),
        fixed(v.z, precision)
    )
}

pub fn format_transformation(t: &Transformation, precision: usize) -> Vec<String> {
    let (a, b, c) = t.rotation().to_abc();
    let abc = Vector::new(a.to_degrees(), b.to_degrees(), c.to_degrees());
    let q = t.rotation().to_quaternion();
    vec![
        format!("xyz  {}", format_vector(t.translation(), precision)),
        format!("abc  {} deg", format_vector(&abc, precision)),
        format!(
            "quat [{}, {}, {}, {}]",
            fixed(q.w, precision),
            fixed(q.x, precision),
            fixed(q.y, precision),
            fixed(q.z, precision)
        ),
    ]
}

pub fn format_twist(t: &Twist, precision: usize) -> Vec<String> {
    vec![
        format!("linear  {}", format_vector(&t.linear, precision)),
        format!("angular {}", format_vector(&t.angular, precision)),
    ]
}

fn help_lines() -> Vec<String> {
    [
        ("/frames", "list registered frames"),
        ("/view <name>", "commanded, measured or static"),
        ("/path A B", "shortest relation path from A to B"),
        ("/tf A B", "transformation of B relative to A"),
        ("/twist A B", "twist of B relative to A"),
        ("/connected A", "frames reachable from A"),
        ("/quit  /exit", "exit the CLI"),
    ]
    .iter()
    .map(|(cmd, what)| format!("{cmd:<14} – {what}"))
    .collect()
}

/// Read commands from stdin until EOF, `/quit` or `shutdown` is set.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", format!("worldframe[{}]>", session.view()).bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line).and_then(|command| session.execute(command)) {
            Ok(Reply::Lines(lines)) => {
                for line in lines {
                    println!("  {line}");
                }
            }
            Ok(Reply::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => println!("{} {}", "error:".red(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene;

    const CELL: &str = r#"
        [[relations]]
        from = "World origin"
        to = "table"
        kind = "static"
        translation = [1.0, 0.0, 0.0]

        [[relations]]
        from = "table"
        to = "slide"
        kind = "dynamic"
        commanded = { translation = [0.5, 0.0, 0.0] }
        measured = { translation = [0.4, 0.0, 0.0] }
        twist = { angular = [0.0, 0.0, 1.0] }

        [[frames]]
        name = "shelf"
    "#;

    fn session() -> Session {
        Session::new(scene::parse(CELL).unwrap(), ViewChoice::Commanded, 3)
    }

    fn lines(reply: Reply) -> Vec<String> {
        match reply {
            Reply::Lines(lines) => lines,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("/help"), Ok(Command::Help));
        assert_eq!(
            Command::parse(r#"/tf "World origin" slide"#),
            Ok(Command::Tf("World origin".to_string(), "slide".to_string()))
        );
        assert_eq!(Command::parse("/view measured"), Ok(Command::View(ViewChoice::Measured)));
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
        assert!(Command::parse("/tf only-one").unwrap_err().contains("usage"));
        assert!(Command::parse("/view sideways").is_err());
        assert!(Command::parse("/fly").unwrap_err().contains("Unknown command"));
        assert!(Command::parse(r#"/path "open a"#).is_err());
    }

    #[test]
    fn split_args_handles_quotes_and_empty_strings() {
        assert_eq!(split_args(r#"  a "b c"  d "#).unwrap(), vec!["a", "b c", "d"]);
        assert_eq!(split_args(r#"x """#).unwrap(), vec!["x", ""]);
    }

    #[test]
    fn transformation_follows_the_view() {
        let mut s = session();
        let out = lines(s.execute(Command::Tf("World origin".into(), "slide".into())).unwrap());
        assert_eq!(out[0], "xyz  [1.500, 0.000, 0.000]");

        s.execute(Command::View(ViewChoice::Measured)).unwrap();
        let out = lines(s.execute(Command::Tf("World origin".into(), "slide".into())).unwrap());
        assert_eq!(out[0], "xyz  [1.400, 0.000, 0.000]");

        s.execute(Command::View(ViewChoice::Static)).unwrap();
        let err = s.execute(Command::Tf("World origin".into(), "slide".into())).unwrap_err();
        assert!(err.contains("no path"));
    }

    #[test]
    fn path_lists_relations_in_order() {
        let mut s = session();
        let out = lines(s.execute(Command::Path("World origin".into(), "slide".into())).unwrap());
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("World origin -> table [static]"));
        assert!(out[1].starts_with("table -> slide [dynamic]"));

        let same = lines(s.execute(Command::Path("table".into(), "table".into())).unwrap());
        assert_eq!(same, vec!["(same frame)"]);
        assert!(s.execute(Command::Path("table".into(), "shelf".into())).is_err());
        assert!(s.execute(Command::Path("table".into(), "nowhere".into())).is_err());
    }

    #[test]
    fn twist_and_connected() {
        let mut s = session();
        let out = lines(s.execute(Command::Twist("table".into(), "slide".into())).unwrap());
        assert_eq!(out[1], "angular [0.000, 0.000, 1.000]");

        let reached = lines(s.execute(Command::Connected("table".into())).unwrap());
        assert_eq!(reached.len(), 2);
        assert!(reached.contains(&"slide".to_string()));
        let none = lines(s.execute(Command::Connected("shelf".into())).unwrap());
        assert_eq!(none, vec!["(none)"]);
    }

    #[test]
    fn frames_and_quit() {
        let mut s = session();
        let out = lines(s.execute(Command::Frames).unwrap());
        assert_eq!(out.len(), 4);
        assert!(out.iter().any(|l| l.starts_with("shelf")));
        assert_eq!(s.execute(Command::Quit), Ok(Reply::Quit));
    }

    #[test]
    fn negative_zero_is_printed_unsigned() {
        assert_eq!(fixed(-0.0, 2), "0.00");
        assert_eq!(fixed(-1e-9, 3), "0.000");
        assert_eq!(fixed(-0.5, 1), "-0.5");
    }

    #[test]
    fn format_transformation_prints_degrees() {
        let t = Transformation::from_abc(0.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let out = format_transformation(&t, 1);
        assert_eq!(out[1], "abc  [90.0, 0.0, 0.0] deg");
    }
}
