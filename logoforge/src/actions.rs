//! Line commands, as typed at the prompt or piped in from a script.
//!
//! One command per line: a verb, then its arguments separated by whitespace. Verbs that take free
//! text (`text`, `set-text`, `font`, `save`, `layer rename`) take the rest of the line as-is.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use logoforge_core::color::{Color, ColorParseError};
use logoforge_core::editor::AlignEdge;
use logoforge_core::util::Rect;
use logoforge_core::{ElementID, LayerID, Scene};

pub const HELP: &str = "\
elements:
  text [words]               add a text element, centered
  image <path>               add an image (text in it is recognized, if set up)
  backdrop <path>            add a full-canvas template behind everything
  click <id> [+]             select an element, + to add to the selection
  click-at <x> <y> [+]       select whatever is drawn topmost at a point
  deselect                   clear the selection
  align left|center|right    align the primary selection on the canvas
  group | ungroup | delete   act on the selection
  drag <id> <x> <y>          drop an element at a position (snapped if enabled)
  transform <id> <x> <y> <w> <h>
text (primary selection):
  set-text <words> | fill <#rrggbb|name> | font <family> | size <px> | bold | italic
history:
  undo | redo | history <steps|off>
layers:
  layers                     list layers, bottom first
  layer add [name] | use <layer> | show <layer> | hide <layer> | toggle <layer>
  layer move <from> <to> | rename <layer> <name> | remove <layer>
canvas:
  grid <px> | snap on|off | show-grid on|off
output:
  list | status | view <png> | export <png>
store:
  save [name] | load <id> | logos
  help | quit";

#[derive(Clone, Debug, PartialEq, Eq, strum::EnumString, strum::AsRefStr, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
enum Verb {
    Text,
    Image,
    Backdrop,
    Click,
    ClickAt,
    Deselect,
    Align,
    Group,
    Ungroup,
    Delete,
    Drag,
    Transform,
    SetText,
    Fill,
    Font,
    Size,
    Bold,
    Italic,
    Undo,
    Redo,
    History,
    Layer,
    Layers,
    Grid,
    Snap,
    ShowGrid,
    List,
    Status,
    View,
    Export,
    Save,
    Load,
    Logos,
    Help,
    #[strum(to_string = "quit", serialize = "exit")]
    Quit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerCommand {
    Add(Option<String>),
    Use(String),
    Show(String),
    Hide(String),
    Toggle(String),
    Move { from: usize, to: usize },
    Rename { layer: String, name: String },
    Remove(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Text(Option<String>),
    Image(PathBuf),
    Backdrop(PathBuf),
    Click { target: String, additive: bool },
    ClickAt { point: [f32; 2], additive: bool },
    Deselect,
    Align(AlignEdge),
    Group,
    Ungroup,
    Delete,
    Drag { target: String, to: [f32; 2] },
    Transform { target: String, rect: Rect },
    SetText(String),
    Fill(Color),
    Font(String),
    Size(f32),
    Bold,
    Italic,
    Undo,
    Redo,
    HistoryLimit(Option<NonZeroUsize>),
    Layer(LayerCommand),
    Layers,
    Grid(f32),
    Snap(bool),
    ShowGrid(bool),
    List,
    Status,
    View(PathBuf),
    Export(PathBuf),
    Save(Option<String>),
    Load(String),
    Logos,
    Help,
    Quit,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command {0:?}, try `help`")]
    UnknownCommand(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("unexpected {0:?}")]
    Unexpected(String),
    #[error("{0:?} is not a number")]
    Number(String),
    #[error("{0:?} is not on or off")]
    Toggle(String),
    #[error("{0:?} is not left, center, or right")]
    Edge(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// Remaining words of a line.
struct Args<'a> {
    rest: &'a str,
}
impl<'a> Args<'a> {
    fn word(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(word)
    }
    fn required(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        self.word().ok_or(ParseError::Missing(what))
    }
    fn owned(&mut self, what: &'static str) -> Result<String, ParseError> {
        self.required(what).map(str::to_owned)
    }
    fn index(&mut self, what: &'static str) -> Result<usize, ParseError> {
        let word = self.required(what)?;
        word.parse()
            .map_err(|_| ParseError::Number(word.to_owned()))
    }
    fn number(&mut self, what: &'static str) -> Result<f32, ParseError> {
        let word = self.required(what)?;
        word.parse::<f32>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| ParseError::Number(word.to_owned()))
    }
    fn point(&mut self) -> Result<[f32; 2], ParseError> {
        Ok([self.number("x")?, self.number("y")?])
    }
    fn toggle(&mut self) -> Result<bool, ParseError> {
        match self.required("on or off")? {
            "on" | "true" | "yes" => Ok(true),
            "off" | "false" | "no" => Ok(false),
            other => Err(ParseError::Toggle(other.to_owned())),
        }
    }
    /// A trailing `+`, for additive clicks.
    fn plus(&mut self) -> Result<bool, ParseError> {
        match self.word() {
            None => Ok(false),
            Some("+") => Ok(true),
            Some(other) => Err(ParseError::Unexpected(other.to_owned())),
        }
    }
    /// Everything left, trimmed. `None` if that's nothing.
    fn rest(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.rest).trim();
        (!rest.is_empty()).then(|| rest.to_owned())
    }
    fn end(&mut self) -> Result<(), ParseError> {
        match self.word() {
            None => Ok(()),
            Some(extra) => Err(ParseError::Unexpected(extra.to_owned())),
        }
    }
}

impl std::str::FromStr for Command {
    type Err = ParseError;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut args = Args { rest: line };
        let verb = args.required("command")?;
        let verb: Verb = verb
            .parse()
            .map_err(|_| ParseError::UnknownCommand(verb.to_owned()))?;
        let command = match verb {
            Verb::Text => Self::Text(args.rest()),
            Verb::Image => Self::Image(args.rest().ok_or(ParseError::Missing("path"))?.into()),
            Verb::Backdrop => {
                Self::Backdrop(args.rest().ok_or(ParseError::Missing("path"))?.into())
            }
            Verb::Click => Self::Click {
                target: args.owned("element")?,
                additive: args.plus()?,
            },
            Verb::ClickAt => Self::ClickAt {
                point: args.point()?,
                additive: args.plus()?,
            },
            Verb::Deselect => Self::Deselect,
            Verb::Align => {
                let edge = args.required("edge")?;
                Self::Align(
                    edge.parse()
                        .map_err(|_| ParseError::Edge(edge.to_owned()))?,
                )
            }
            Verb::Group => Self::Group,
            Verb::Ungroup => Self::Ungroup,
            Verb::Delete => Self::Delete,
            Verb::Drag => Self::Drag {
                target: args.owned("element")?,
                to: args.point()?,
            },
            Verb::Transform => {
                let target = args.owned("element")?;
                let [x, y] = args.point()?;
                let rect = Rect::new(x, y, args.number("width")?, args.number("height")?);
                Self::Transform { target, rect }
            }
            Verb::SetText => Self::SetText(args.rest().unwrap_or_default()),
            Verb::Fill => Self::Fill(args.required("color")?.parse()?),
            Verb::Font => Self::Font(args.rest().ok_or(ParseError::Missing("font family"))?),
            Verb::Size => Self::Size(args.number("size")?),
            Verb::Bold => Self::Bold,
            Verb::Italic => Self::Italic,
            Verb::Undo => Self::Undo,
            Verb::Redo => Self::Redo,
            Verb::History => {
                let steps = args.required("steps")?;
                if steps == "off" {
                    Self::HistoryLimit(None)
                } else {
                    let steps: NonZeroUsize = steps
                        .parse()
                        .map_err(|_| ParseError::Number(steps.to_owned()))?;
                    Self::HistoryLimit(Some(steps))
                }
            }
            Verb::Layer => Self::Layer(parse_layer(&mut args)?),
            Verb::Layers => Self::Layers,
            Verb::Grid => Self::Grid(args.number("grid size")?),
            Verb::Snap => Self::Snap(args.toggle()?),
            Verb::ShowGrid => Self::ShowGrid(args.toggle()?),
            Verb::List => Self::List,
            Verb::Status => Self::Status,
            Verb::View => Self::View(args.rest().ok_or(ParseError::Missing("path"))?.into()),
            Verb::Export => Self::Export(args.rest().ok_or(ParseError::Missing("path"))?.into()),
            Verb::Save => Self::Save(args.rest()),
            Verb::Load => Self::Load(args.owned("logo id")?),
            Verb::Logos => Self::Logos,
            Verb::Help => Self::Help,
            Verb::Quit => Self::Quit,
        };
        args.end()?;
        Ok(command)
    }
}

fn parse_layer(args: &mut Args<'_>) -> Result<LayerCommand, ParseError> {
    let command = match args.required("layer command")? {
        "add" => LayerCommand::Add(args.rest()),
        "use" => LayerCommand::Use(args.owned("layer")?),
        "show" => LayerCommand::Show(args.owned("layer")?),
        "hide" => LayerCommand::Hide(args.owned("layer")?),
        "toggle" => LayerCommand::Toggle(args.owned("layer")?),
        "remove" => LayerCommand::Remove(args.owned("layer")?),
        "rename" => LayerCommand::Rename {
            layer: args.owned("layer")?,
            name: args.rest().ok_or(ParseError::Missing("name"))?,
        },
        "move" => LayerCommand::Move {
            from: args.index("from")?,
            to: args.index("to")?,
        },
        other => return Err(ParseError::UnknownCommand(format!("layer {other}"))),
    };
    Ok(command)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no {kind} matches {query:?}")]
    NotFound { kind: &'static str, query: String },
    #[error("{query:?} could be any of {count} {kind}s")]
    Ambiguous {
        kind: &'static str,
        query: String,
        count: usize,
    },
}

fn resolve_one<'a, T: 'a>(
    kind: &'static str,
    query: &str,
    candidates: impl Iterator<Item = (&'a T, bool)>,
) -> Result<&'a T, ResolveError> {
    let mut matches = candidates.filter(|(_, matched)| *matched).map(|(id, _)| id);
    let first = matches.next().ok_or_else(|| ResolveError::NotFound {
        kind,
        query: query.to_owned(),
    })?;
    let others = matches.count();
    if others > 0 {
        return Err(ResolveError::Ambiguous {
            kind,
            query: query.to_owned(),
            count: others + 1,
        });
    }
    Ok(first)
}

/// Find a top-level element by its full ID or a unique prefix of it.
pub fn resolve_element(scene: &Scene, query: &str) -> Result<ElementID, ResolveError> {
    if let Some(exact) = scene
        .elements()
        .iter()
        .find(|element| element.id.as_str() == query)
    {
        return Ok(exact.id.clone());
    }
    let candidates = scene
        .elements()
        .iter()
        .map(|element| (&element.id, element.id.as_str().starts_with(query)));
    resolve_one("element", query, candidates).cloned()
}

/// Find a layer by its ID, its exact name, or a unique prefix of its ID.
pub fn resolve_layer(scene: &Scene, query: &str) -> Result<LayerID, ResolveError> {
    let layers = scene.layers();
    if let Some(exact) = layers
        .iter()
        .find(|layer| layer.id.as_str() == query || layer.name == query)
    {
        return Ok(exact.id.clone());
    }
    let candidates = layers
        .iter()
        .map(|layer| (&layer.id, layer.id.as_str().starts_with(query)));
    resolve_one("layer", query, candidates).cloned()
}

#[cfg(test)]
mod test {
    use super::*;
    use logoforge_core::{Editor, EditorConfig};

    #[test]
    fn parses_commands() {
        assert_eq!("text".parse(), Ok(Command::Text(None)));
        assert_eq!(
            "text  Hello world ".parse(),
            Ok(Command::Text(Some("Hello world".into())))
        );
        assert_eq!(
            "click text-4f + ".parse(),
            Ok(Command::Click {
                target: "text-4f".into(),
                additive: true
            })
        );
        assert_eq!(
            "transform g 1 2 30.5 40".parse(),
            Ok(Command::Transform {
                target: "g".into(),
                rect: Rect::new(1.0, 2.0, 30.5, 40.0)
            })
        );
        assert_eq!("align center".parse(), Ok(Command::Align(AlignEdge::Center)));
        assert_eq!("fill #ff0000".parse(), Ok(Command::Fill(Color::rgb(255, 0, 0))));
        assert_eq!("snap on".parse(), Ok(Command::Snap(true)));
        assert_eq!("show-grid off".parse(), Ok(Command::ShowGrid(false)));
        assert_eq!("history off".parse(), Ok(Command::HistoryLimit(None)));
        assert_eq!(
            "layer move 0 2".parse(),
            Ok(Command::Layer(LayerCommand::Move { from: 0, to: 2 }))
        );
        assert_eq!(
            "layer rename default Back drop".parse(),
            Ok(Command::Layer(LayerCommand::Rename {
                layer: "default".into(),
                name: "Back drop".into()
            }))
        );
        assert_eq!("exit".parse(), Ok(Command::Quit));
        assert_eq!(
            "image ./my logo.png".parse(),
            Ok(Command::Image("./my logo.png".into()))
        );
    }
    #[test]
    fn rejects_nonsense() {
        assert_eq!(
            "frobnicate".parse::<Command>(),
            Err(ParseError::UnknownCommand("frobnicate".into()))
        );
        assert_eq!("".parse::<Command>(), Err(ParseError::Missing("command")));
        assert_eq!(
            "drag a 1".parse::<Command>(),
            Err(ParseError::Missing("y"))
        );
        assert_eq!(
            "size big".parse::<Command>(),
            Err(ParseError::Number("big".into()))
        );
        assert_eq!(
            "size NaN".parse::<Command>(),
            Err(ParseError::Number("NaN".into()))
        );
        assert_eq!(
            "align top".parse::<Command>(),
            Err(ParseError::Edge("top".into()))
        );
        assert_eq!(
            "undo 3".parse::<Command>(),
            Err(ParseError::Unexpected("3".into()))
        );
        assert!(matches!(
            "fill mauve".parse::<Command>(),
            Err(ParseError::Color(_))
        ));
    }
    #[test]
    fn every_verb_has_help() {
        use strum::IntoEnumIterator;
        for verb in Verb::iter() {
            assert!(HELP.contains(verb.as_ref()), "{verb:?} missing from help");
        }
    }
    #[test]
    fn resolves_prefixes() {
        let mut editor = Editor::new(EditorConfig::default());
        let text = editor.add_text("a");
        let other = editor.add_text("b");
        assert_eq!(resolve_element(editor.scene(), text.as_str()), Ok(text.clone()));
        assert!(matches!(
            resolve_element(editor.scene(), "text-"),
            Err(ResolveError::Ambiguous { count: 2, .. })
        ));
        // Uuids differ somewhere in the first few characters.
        let unique = (6..text.as_str().len())
            .map(|len| &text.as_str()[..len])
            .find(|prefix| !other.as_str().starts_with(prefix))
            .unwrap();
        assert_eq!(resolve_element(editor.scene(), unique), Ok(text));
        assert!(matches!(
            resolve_element(editor.scene(), "image-"),
            Err(ResolveError::NotFound { .. })
        ));

        let layer = editor.add_layer(Some("Logo text".into()));
        assert_eq!(resolve_layer(editor.scene(), "Logo text"), Ok(layer));
        assert_eq!(
            resolve_layer(editor.scene(), "def").unwrap().as_str(),
            "default"
        );
    }
}
