//! Terminal Surface
//!
//! One game session on stdin/stdout. Each input line is parsed into a
//! [`GameIntent`]; every [`GameMessage`] the controller sends back is
//! rendered as plain text. Like any surface it holds no game logic: it shows
//! the latest snapshot and lets the controller decide what is allowed.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use hunter_core::{
    Category, ControllerConfig, GameClients, GameController, GameIntent, GameMessage,
    GameSnapshot, HunterConfig, Label, ModelChoice, NotifyLevel, Phase, Slot, SubjectEntry,
};

const HELP: &str = "\
Commands:
  subjects            list selectable subjects
  select <id>         start a round for a subject
  model <name>        switch model (ollama, openai, gemini)
  generate            synthesize the AI image
  pick left|right     pick the image you think is AI-generated
  guess real|ai       label the left image
  translate <text>    translate text with the current model
  reset               start a new session
  help                show this help
  quit                leave";

/// A parsed input line
#[derive(Debug, PartialEq, Eq)]
pub enum PlayCommand {
    /// Forward to the controller
    Intent(GameIntent),
    /// Print the catalog
    Subjects,
    /// Print usage
    Help,
}

/// Parse one input line; blank lines are `Ok(None)`
pub fn parse_command(line: &str) -> Result<Option<PlayCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "help" | "?" => PlayCommand::Help,
        "subjects" | "list" => PlayCommand::Subjects,
        "select" => {
            if rest.is_empty() {
                return Err("usage: select <id>".into());
            }
            PlayCommand::Intent(GameIntent::SelectSubject {
                subject_id: rest.to_lowercase(),
            })
        }
        "model" => {
            let model = rest.parse::<ModelChoice>()?;
            PlayCommand::Intent(GameIntent::ChangeModel { model })
        }
        "generate" | "gen" => PlayCommand::Intent(GameIntent::GenerateImage),
        "pick" => {
            let slot = Slot::parse(rest).ok_or("usage: pick left|right")?;
            PlayCommand::Intent(GameIntent::PickImage { slot })
        }
        "guess" => {
            // Labels the left image; the pick is whichever image is called AI
            let slot = match Label::parse(rest).ok_or("usage: guess real|ai")? {
                Label::Synthetic => Slot::Left,
                Label::Real => Slot::Right,
            };
            PlayCommand::Intent(GameIntent::PickImage { slot })
        }
        "translate" => PlayCommand::Intent(GameIntent::Translate {
            text: rest.to_string(),
        }),
        "reset" => PlayCommand::Intent(GameIntent::ResetSession),
        "quit" | "exit" => PlayCommand::Intent(GameIntent::Quit),
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

/// Rendering state: the catalog and the last snapshot shown
#[derive(Debug, Default)]
pub struct Terminal {
    subjects: Vec<SubjectEntry>,
    last: Option<GameSnapshot>,
}

impl Terminal {
    /// Lines to print for a controller message
    pub fn render(&mut self, msg: &GameMessage) -> Vec<String> {
        match msg {
            GameMessage::SessionInfo {
                session_id,
                model,
                round_limit,
            } => vec![
                format!("Session {session_id}: {round_limit} rounds, model {model}"),
                "Type 'subjects' to see what you can hunt, 'help' for commands.".into(),
            ],
            GameMessage::Catalog { subjects } => {
                self.subjects.clone_from(subjects);
                Vec::new()
            }
            GameMessage::Snapshot { snapshot } => {
                if self.last.as_ref() == Some(snapshot) {
                    return Vec::new();
                }
                let lines = render_snapshot(snapshot);
                self.last = Some(snapshot.clone());
                lines
            }
            GameMessage::RoundRecorded {
                round_index,
                subject_id,
                guess,
                correct,
            } => {
                let verdict = if *correct { "correct" } else { "wrong" };
                vec![format!(
                    "Round {round_index} ({subject_id}): you picked the {guess} image, {verdict}"
                )]
            }
            GameMessage::SessionOver { score, round_limit } => vec![format!(
                "Session over: {score}/{round_limit}. Select a subject to play again."
            )],
            GameMessage::Translation { text, translation } => {
                vec![format!("{text} => {translation}")]
            }
            GameMessage::Notify { level, message } => {
                let tag = match level {
                    NotifyLevel::Info => "info",
                    NotifyLevel::Warning => "warning",
                    NotifyLevel::Error => "error",
                    NotifyLevel::Success => "ok",
                };
                vec![format!("[{tag}] {message}")]
            }
            GameMessage::Quit { message } => message.iter().cloned().collect(),
        }
    }

    /// Catalog grouped by category
    pub fn subject_list(&self) -> Vec<String> {
        if self.subjects.is_empty() {
            return vec!["No subjects received yet".into()];
        }
        Category::ALL
            .iter()
            .filter_map(|category| {
                let ids: Vec<&str> = self
                    .subjects
                    .iter()
                    .filter(|s| s.category == *category)
                    .map(|s| s.id.as_str())
                    .collect();
                (!ids.is_empty()).then(|| format!("{}: {}", category.label(), ids.join(", ")))
            })
            .collect()
    }
}

fn image_in(snapshot: &GameSnapshot, label: Label) -> &str {
    let image = match label {
        Label::Real => snapshot.real_image.as_ref(),
        Label::Synthetic => snapshot.generated_image.as_ref(),
    };
    image.map_or("(missing)", |i| i.url.as_str())
}

fn render_snapshot(snapshot: &GameSnapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] round {}/{}, score {}",
        snapshot.phase, snapshot.round_index, snapshot.round_limit, snapshot.score
    )];

    match snapshot.phase {
        Phase::PromptReady => {
            lines.push(format!("Prompt: {}", snapshot.prompt));
            lines.push("Type 'generate' to create the AI image.".into());
        }
        Phase::GuessPending => {
            let [left, right] = snapshot.display_order;
            lines.push(format!("Left:  {}", image_in(snapshot, left)));
            lines.push(format!("Right: {}", image_in(snapshot, right)));
            lines.push("Which one is AI-generated? 'pick left' or 'pick right'.".into());
        }
        Phase::RoundResolved | Phase::SessionComplete if snapshot.resolved => {
            let [left, right] = snapshot.display_order;
            lines.push(format!("Left was {left}, right was {right}."));
            if let Some(credit) = snapshot
                .real_image
                .as_ref()
                .and_then(|i| i.attribution.as_ref())
            {
                lines.push(format!(
                    "Photo by {} ({})",
                    credit.author, credit.source_link
                ));
            }
        }
        _ => {}
    }

    if let Some(kind) = snapshot.last_error {
        lines.push(format!("Last error: {kind:?}"));
    }
    lines
}

/// Play one session until the player quits or stdin closes
pub async fn run(config: HunterConfig) -> anyhow::Result<()> {
    let (msg_tx, mut msg_rx) = mpsc::channel(256);
    let (intent_tx, intent_rx) = mpsc::channel(64);

    let controller = GameController::new(
        GameClients::from_config(&config),
        ControllerConfig::from_config(&config),
        msg_tx,
    );
    info!(session = %controller.session_id(), "Starting terminal session");
    let game = tokio::spawn(controller.run(intent_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut terminal = Terminal::default();
    // Dropped on EOF so the controller shuts down
    let mut intent_tx = Some(intent_tx);

    loop {
        tokio::select! {
            line = lines.next_line(), if intent_tx.is_some() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    intent_tx = None;
                    continue;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(PlayCommand::Help)) => println!("{HELP}"),
                    Ok(Some(PlayCommand::Subjects)) => {
                        for line in terminal.subject_list() {
                            println!("{line}");
                        }
                    }
                    Ok(Some(PlayCommand::Intent(intent))) => {
                        let quitting = intent == GameIntent::Quit;
                        if let Some(tx) = &intent_tx {
                            if tx.send(intent).await.is_err() {
                                break;
                            }
                        }
                        if quitting {
                            intent_tx = None;
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }

            msg = msg_rx.recv() => {
                let Some(msg) = msg else { break };
                for line in terminal.render(&msg) {
                    println!("{line}");
                }
            }
        }
    }

    game.await.context("Game task failed")?;
    Ok(())
}
