//! Interactive REPL (Read-Eval-Print Loop) for blockvcs.

use std::io::{self, BufRead, Write};

use super::handle::ServiceHandle;
use super::service::{ApiError, ApiResult, Request, Response};
use crate::storage::{BranchId, Commit, Item, Snapshot, StorageError};

/// REPL configuration.
#[derive(Debug, Clone)]
pub struct ReplConfig {
    /// Prompt string.
    pub prompt: String,
    /// Show timing information.
    pub timing: bool,
    /// Max commits shown by `.log`.
    pub max_commits: usize,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "blockvcs> ".into(),
            timing: false,
            max_commits: 50,
        }
    }
}

/// The interactive REPL.
pub struct Repl {
    service: ServiceHandle,
    config: ReplConfig,
    history: Vec<String>,
}

impl Repl {
    pub fn new(service: ServiceHandle) -> Self {
        Self::with_config(service, ReplConfig::default())
    }

    pub fn with_config(service: ServiceHandle, config: ReplConfig) -> Self {
        Self {
            service,
            config,
            history: Vec::new(),
        }
    }

    /// Run the REPL until `.quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}", self.config.prompt);
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!("\nGoodbye!");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.history.push(line.to_string());

            match self.execute_line(line) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => eprintln!("Error: {}", e),
            }
        }

        Ok(())
    }

    /// Execute one line of input. Returns true when the REPL should exit.
    pub fn execute_line(&mut self, line: &str) -> ApiResult<bool> {
        if line.starts_with('{') {
            let start = std::time::Instant::now();
            match self.service.handle_json(line) {
                Ok(out) => println!("{}", out),
                Err(e) => println!("{}", e.to_json()),
            }
            if self.config.timing {
                println!("Time: {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
            return Ok(false);
        }
        if line.starts_with('.') {
            return self.handle_command(line);
        }
        eprintln!("Enter a JSON request or a .command (see .help)");
        Ok(false)
    }

    fn print_banner(&self) {
        println!("blockvcs v{}", env!("CARGO_PKG_VERSION"));
        println!("Type .help for commands, or enter a JSON request");
        println!();
    }

    fn handle_command(&mut self, cmd: &str) -> ApiResult<bool> {
        let cmd = cmd.trim_start_matches('.');
        let (command, rest) = match cmd.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (cmd, ""),
        };

        match command.to_lowercase().as_str() {
            "help" | "h" | "?" => self.print_help(),
            "quit" | "exit" | "q" => return Ok(true),
            "log" => self.print_log(),
            "branches" => self.print_branches(),
            "status" => self.print_status(),
            "todo" => {
                if rest.is_empty() {
                    eprintln!("Usage: .todo <title>");
                } else {
                    self.stage_todo(rest)?;
                }
            }
            "commit" => {
                if rest.is_empty() {
                    eprintln!("Usage: .commit <message>");
                } else {
                    let commit = self.commit_staged(rest)?;
                    println!("[{}] {}", commit.id.short(), commit.summary());
                }
            }
            "checkout" => {
                if rest.is_empty() {
                    eprintln!("Usage: .checkout <branch-id>");
                } else {
                    let branch_id = BranchId::new(rest).map_err(StorageError::from)?;
                    self.service.handle(Request::CheckoutBranch { branch_id })?;
                    self.print_status();
                }
            }
            "save" => {
                self.service.with(|service| service.save())?;
                println!("Saved.");
            }
            "history" => self.print_history(),
            "timing" => {
                self.config.timing = !self.config.timing;
                println!("Timing: {}", if self.config.timing { "on" } else { "off" });
            }
            other => {
                eprintln!("Unknown command: .{}", other);
                eprintln!("Type .help for available commands");
            }
        }

        Ok(false)
    }

    /// Append a todo to the staged snapshot, starting from the checked-out
    /// tree when nothing is staged yet.
    fn stage_todo(&self, title: &str) -> ApiResult<()> {
        let mut tree = self.service.with(|service| {
            let engine = service.engine();
            engine
                .staged()
                .or_else(|| engine.get_head().map(|c| &c.tree))
                .cloned()
                .unwrap_or_else(Snapshot::empty)
        });
        tree.push(Item::todo(title));
        let count = tree.item_count();
        self.service.handle(Request::Stage { tree })?;
        println!("Staged {} item(s).", count);
        Ok(())
    }

    fn commit_staged(&self, message: &str) -> ApiResult<Commit> {
        let tree = self
            .service
            .with(|service| service.engine().staged().cloned())
            .ok_or_else(|| ApiError::BadRequest("nothing staged, use .todo first".into()))?;
        let response = self.service.handle(Request::Commit {
            message: Some(message.to_string()),
            tree,
        })?;
        match response {
            Response::Commit { commit } => Ok(commit),
            _ => Err(ApiError::BadRequest("unexpected response to commit".into())),
        }
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  .help, .h, .?           Show this help message");
        println!("  .quit, .exit, .q        Exit the REPL");
        println!("  .log                    List commits of the active branch");
        println!("  .branches               List branches");
        println!("  .status                 Show active branch, head and staging");
        println!("  .todo <title>           Stage a new todo item");
        println!("  .commit <message>       Commit the staged snapshot");
        println!("  .checkout <branch-id>   Switch the active branch");
        println!("  .save                   Write the document now");
        println!("  .history                Show command history");
        println!("  .timing                 Toggle timing display");
        println!();
        println!("JSON requests:");
        println!("  {{\"op\": \"listCommits\"}}");
        println!("  {{\"op\": \"createBranch\", \"name\": \"feature\", \"checkout\": true}}");
        println!("  {{\"op\": \"resetToCommit\", \"commitId\": \"...\"}}");
        println!();
    }

    fn print_log(&self) {
        self.service.with(|service| {
            let commits = service.engine().list_commits();
            if commits.is_empty() {
                println!("No commits.");
                return;
            }
            for commit in commits.iter().take(self.config.max_commits) {
                println!("{}", format_commit(commit));
            }
            if commits.len() > self.config.max_commits {
                println!("... ({} more)", commits.len() - self.config.max_commits);
            }
        });
    }

    fn print_branches(&self) {
        self.service.with(|service| {
            let engine = service.engine();
            for branch in engine.list_branches() {
                let marker = if &branch.id == engine.current_branch_id() { "*" } else { " " };
                let head = branch.head_id.as_ref().map(|h| h.short()).unwrap_or("-");
                println!("{} {:<20} {}  {}", marker, branch.name.as_str(), head, branch.id);
            }
        });
    }

    fn print_status(&self) {
        self.service.with(|service| {
            let engine = service.engine();
            if let Some(branch) = engine.current_branch() {
                println!("On branch {} ({})", branch.name, branch.id);
            }
            match engine.get_head() {
                Some(head) if engine.is_detached() => {
                    println!("HEAD detached at {}", format_commit(head))
                }
                Some(head) => println!("HEAD {}", format_commit(head)),
                None => println!("No commits yet."),
            }
            match engine.staged() {
                Some(staged) => println!("Staged: {} item(s)", staged.item_count()),
                None => println!("Nothing staged."),
            }
        });
    }

    fn print_history(&self) {
        println!("Command History:");
        for (i, cmd) in self.history.iter().enumerate() {
            println!("  {}: {}", i + 1, cmd);
        }
    }
}

fn format_commit(commit: &Commit) -> String {
    format!(
        "{} {} {}",
        commit.id.short(),
        commit.timestamp.format("%Y-%m-%d %H:%M:%S"),
        commit.summary()
    )
}
