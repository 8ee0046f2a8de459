use std::io::{self, Write};
use std::path::PathBuf;

use super::document::process_paths;
use super::write::export_transcript;
use super::DocSession;
use crate::session::{Reply, ReplyKind};

/// A line typed into the chat session.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Process { paths: Vec<PathBuf>, recursive: bool },
    History,
    Export(PathBuf),
    Clear,
    Question(String),
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Input::Quit;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Question(line.to_string());
    };

    let mut words = command.split_whitespace();
    match words.next() {
        Some("process") => {
            let mut recursive = false;
            let mut paths = Vec::new();
            for word in words {
                match word {
                    "-r" | "--recursive" => recursive = true,
                    path => paths.push(PathBuf::from(path)),
                }
            }
            Input::Process { paths, recursive }
        }
        Some("history") => Input::History,
        Some("clear") => Input::Clear,
        Some("export") => match words.next() {
            Some(path) => Input::Export(PathBuf::from(path)),
            None => Input::Unknown("usage: :export <file.xlsx>".to_string()),
        },
        _ => Input::Unknown(format!("unknown command: {}", line)),
    }
}

pub async fn handle_chat_session(session: &mut DocSession) -> anyhow::Result<()> {
    println!("Chat with your documents. Commands: :process <paths...>, :history, :export <file.xlsx>, :clear, quit");
    if !session.is_ready() {
        println!("No documents processed yet. Use :process <paths...> first.");
    }

    let mut input = String::new();
    loop {
        print!(">>> ");
        io::stdout().flush()?;
        input.clear();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match parse_input(&input) {
            Input::Quit => break,
            Input::Empty => continue,
            Input::Question(question) => {
                let reply = session.ask(&question).await;
                print_reply(&reply);
            }
            Input::Process { paths, recursive } => {
                // A failed pass is reported and the session keeps going.
                if let Err(err) = process_paths(session, &paths, recursive).await {
                    println!("error: {:#}", err);
                }
            }
            Input::History => {
                for talk in session.history() {
                    println!("[{}] {}: {}", talk.at.format("%H:%M:%S"), talk.role.as_str(), talk.content);
                }
            }
            Input::Export(path) => match export_transcript(session.history(), &path) {
                Ok(()) => println!("Conversation exported to {}", path.display()),
                Err(err) => println!("error: {:#}", err),
            },
            Input::Clear => {
                session.clear_history();
                println!("History cleared");
            }
            Input::Unknown(message) => println!("{}", message),
        }
    }

    Ok(())
}

pub async fn ask_once(session: &mut DocSession, question: &str) -> anyhow::Result<()> {
    let reply = session.ask(question).await;
    print_reply(&reply);
    if reply.kind == ReplyKind::Error {
        anyhow::bail!("question could not be answered");
    }
    Ok(())
}

fn print_reply(reply: &Reply) {
    match reply.kind {
        ReplyKind::Warning => println!("\nwarning: {}\n", reply.message),
        ReplyKind::Error => println!("\nerror: {}\n", reply.message),
        ReplyKind::Answer | ReplyKind::Success => println!("\n{}\n", reply.message),
    }
}
