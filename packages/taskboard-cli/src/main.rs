use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard_core::types::{
    BoardPatch, CardPatch, NewAttachment, NewCard, NewUser, User, UserPatch,
};
use taskboard_core::{scope, BoardView, CardMove, LocalStore, MoveOutcome, Taskboard};

mod config;
mod render;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Personal kanban boards on the command line")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the board data. Overrides the config file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print views as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Change the logged-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// An empty value keeps the current password
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// List your boards
    Boards {
        /// Only boards whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    CreateBoard {
        name: String,
    },
    RenameBoard {
        name: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    DeleteBoard {
        board: String,
    },
    /// Focus a board
    Select {
        board: String,
    },
    /// Print a board with its lists and cards
    Show {
        #[arg(short, long)]
        board: Option<String>,
    },
    AddList {
        name: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    DeleteList {
        /// List id or name
        list: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    AddCard {
        title: String,
        /// List id or name
        #[arg(short, long)]
        list: String,
        #[arg(short, long)]
        board: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        assignee: String,
        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    UpdateCard {
        card: String,
        #[arg(short, long)]
        list: String,
        #[arg(short, long)]
        board: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
    },
    DeleteCard {
        card: String,
        #[arg(short, long)]
        list: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Drop a card onto another card or onto a list
    MoveCard {
        card: String,
        /// Card id, list id or list name
        target: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Attach a file reference to a card
    Attach {
        card: String,
        file: PathBuf,
        #[arg(short, long)]
        list: String,
        #[arg(short, long)]
        board: Option<String>,
        #[arg(long, default_value = "application/octet-stream")]
        mime_type: String,
    },
    Detach {
        card: String,
        attachment: String,
        #[arg(short, long)]
        list: String,
        #[arg(short, long)]
        board: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);
    let data_dir = config::resolve_data_dir(cli.data_dir.clone(), &config);

    let store = LocalStore::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    let engine = Taskboard::open(store, &config).context("Failed to load boards")?;
    let report = engine.migration();
    if !report.is_clean() {
        log::info!(
            "Repaired stored boards: kept {}, dropped {}",
            report.kept,
            report.dropped()
        );
    }

    run(&engine, cli.command, cli.json)
}

struct Session<'a> {
    engine: &'a Taskboard<LocalStore>,
    json: bool,
}

impl Session<'_> {
    fn user(&self) -> Result<User> {
        match self.engine.accounts().current_user()? {
            Some(user) => Ok(user),
            None => bail!("Not logged in. Run `taskboard login` first."),
        }
    }

    /// Explicit `--board`, else the selected board. Either way it has to be
    /// one of the logged-in user's boards.
    fn board_id(&self, explicit: Option<String>) -> Result<String> {
        self.user()?;
        let view = self.engine.boards().view()?;
        let id = match explicit.or_else(|| view.selected_board_id.clone()) {
            Some(id) => id,
            None => bail!("No board selected. Create one with `taskboard create-board`."),
        };
        if view.board(&id).is_none() {
            bail!("Board {} not found", id);
        }
        Ok(id)
    }

    /// Resolve a list by id, falling back to name, on a board the user can see.
    fn list_id(&self, board_id: &str, list: &str) -> Result<String> {
        let view = self.engine.boards().view()?;
        let Some(board) = view.board(board_id) else {
            bail!("Board {} not found", board_id);
        };
        board
            .lists
            .iter()
            .find(|l| l.id == list)
            .or_else(|| board.lists.iter().find(|l| l.name == list))
            .map(|l| l.id.clone())
            .with_context(|| format!("List {:?} not found on {}", list, board.name))
    }

    fn print_view(&self, view: &BoardView) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(view)?);
            return Ok(());
        }
        let boards: Vec<_> = view.boards.iter().collect();
        println!("{}", render::board_index(view, &boards));
        Ok(())
    }

    fn print_selected(&self, view: &BoardView) -> Result<()> {
        if self.json {
            return self.print_view(view);
        }
        match view.selected_board() {
            Some(board) => print!("{}", render::board_detail(board, Local::now().date_naive())),
            None => println!("No board selected."),
        }
        Ok(())
    }

    fn report(&self, changed: bool, what: &str) {
        if !changed {
            eprintln!("{} not found, nothing changed", what);
        }
    }
}

fn run(engine: &Taskboard<LocalStore>, command: Commands, json: bool) -> Result<()> {
    let session = Session { engine, json };
    let repo = engine.boards();
    let accounts = engine.accounts();

    match command {
        Commands::Register { name, email, password, confirm } => {
            let confirm_password = confirm.unwrap_or_else(|| password.clone());
            let (user, view) = accounts.register(NewUser {
                name,
                email,
                password,
                confirm_password,
            })?;
            println!("Registered {}", render::user_line(&user));
            session.print_view(&view)?;
        }
        Commands::Login { email, password } => {
            let (user, view) = accounts.login(&email, &password)?;
            println!("Logged in as {}", render::user_line(&user));
            session.print_view(&view)?;
        }
        Commands::Logout => {
            accounts.logout()?;
            println!("Logged out");
        }
        Commands::Whoami => match accounts.current_user()? {
            Some(user) => println!("{}", render::user_line(&user)),
            None => println!("Not logged in"),
        },
        Commands::Profile { name, email, password, avatar } => {
            let user = accounts.update_user(UserPatch {
                name,
                email,
                password,
                avatar,
            })?;
            println!("Updated {}", render::user_line(&user));
        }
        Commands::Boards { search } => {
            session.user()?;
            let view = repo.view()?;
            let term = search.unwrap_or_default();
            let found = scope::search_boards(&view.boards, &term);
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                println!("{}", render::board_index(&view, &found));
            }
        }
        Commands::CreateBoard { name } => {
            let user = session.user()?;
            let committed = repo.create_board(&name, &user.id)?;
            println!("Created board {} [{}]", committed.value.name, committed.value.id);
        }
        Commands::RenameBoard { name, board } => {
            let board_id = session.board_id(board)?;
            let view = repo.view()?;
            let Some(current) = view.board(&board_id) else {
                bail!("Board {} not found", board_id);
            };
            repo.update_board(current, BoardPatch::rename(&name))?;
            println!("Renamed board to {}", name.trim());
        }
        Commands::DeleteBoard { board } => {
            let board_id = session.board_id(Some(board))?;
            let committed = repo.delete_board(&board_id)?;
            session.report(committed.value, "Board");
            session.print_view(&committed.view)?;
        }
        Commands::Select { board } => {
            session.user()?;
            let view = repo.select_board(&board)?;
            if view.selected_board_id.as_deref() != Some(board.as_str()) {
                eprintln!("Board {} is not one of yours", board);
            }
            session.print_view(&view)?;
        }
        Commands::Show { board } => {
            let board_id = session.board_id(board)?;
            let view = repo.select_board(&board_id)?;
            session.print_selected(&view)?;
        }
        Commands::AddList { name, board } => {
            let board_id = session.board_id(board)?;
            let committed = repo.add_list(&board_id, &name)?;
            session.report(committed.value.is_some(), "Board");
            session.print_selected(&committed.view)?;
        }
        Commands::DeleteList { list, board } => {
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let committed = repo.delete_list(&board_id, &list_id)?;
            session.report(committed.value, "List");
            session.print_selected(&committed.view)?;
        }
        Commands::AddCard {
            title,
            list,
            board,
            description,
            assignee,
            due,
        } => {
            let user = session.user()?;
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let fields = NewCard {
                title,
                description,
                assignee,
                due_date: due,
                attachments: Vec::new(),
            };
            let committed = repo.add_card(&board_id, &list_id, fields, &user.id)?;
            match &committed.value {
                Some(card) => println!("Added card {} [{}]", card.title, card.id),
                None => session.report(false, "List"),
            }
        }
        Commands::UpdateCard {
            card,
            list,
            board,
            title,
            description,
            assignee,
            due,
            clear_due,
        } => {
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let due_date = if clear_due { Some(None) } else { due.map(Some) };
            let patch = CardPatch {
                title,
                description,
                assignee,
                due_date,
                attachments: None,
            };
            let committed = repo.update_card(&board_id, &list_id, &card, patch)?;
            session.report(committed.value, "Card");
            session.print_selected(&committed.view)?;
        }
        Commands::DeleteCard { card, list, board } => {
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let committed = repo.delete_card(&board_id, &list_id, &card)?;
            session.report(committed.value, "Card");
            session.print_selected(&committed.view)?;
        }
        Commands::MoveCard { card, target, board } => {
            let board_id = session.board_id(board)?;
            // A list name is accepted in place of its id.
            let target = session.list_id(&board_id, &target).unwrap_or(target);
            let committed = repo.move_card(&board_id, &CardMove::new(&card, &target))?;
            if committed.value == MoveOutcome::Unchanged {
                eprintln!("Nothing to move");
            }
            session.print_selected(&committed.view)?;
        }
        Commands::Attach {
            card,
            file,
            list,
            board,
            mime_type,
        } => {
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let meta = std::fs::metadata(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let upload = NewAttachment {
                name,
                size: meta.len(),
                mime_type,
                content_ref: Some(file.display().to_string()),
            };
            let committed = repo.add_attachment(&board_id, &list_id, &card, upload)?;
            match &committed.value {
                Some(a) => println!("Attached {} [{}]", a.name, a.id),
                None => session.report(false, "Card"),
            }
        }
        Commands::Detach {
            card,
            attachment,
            list,
            board,
        } => {
            let board_id = session.board_id(board)?;
            let list_id = session.list_id(&board_id, &list)?;
            let committed = repo.remove_attachment(&board_id, &list_id, &card, &attachment)?;
            session.report(committed.value, "Attachment");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::types::Board;
    use taskboard_core::TaskboardConfig;
    use tempfile::TempDir;

    fn register(engine: &Taskboard<LocalStore>, name: &str) -> User {
        let email = format!("{}@example.com", name.to_lowercase());
        let command = Commands::Register {
            name: name.to_string(),
            email,
            password: "secret1".to_string(),
            confirm: None,
        };
        run(engine, command, false).unwrap();
        engine.accounts().current_user().unwrap().unwrap()
    }

    fn board_named(engine: &Taskboard<LocalStore>, name: &str) -> Option<Board> {
        let boards = engine.boards().all_boards().unwrap();
        boards.into_iter().find(|b| b.name == name)
    }

    #[test]
    fn test_commands_cannot_reach_other_users_boards() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let engine = Taskboard::open(store, &TaskboardConfig::default()).unwrap();

        register(&engine, "Owner");
        for name in ["Victim", "Victim2"] {
            let command = Commands::CreateBoard { name: name.to_string() };
            run(&engine, command, false).unwrap();
        }
        let victim = board_named(&engine, "Victim").unwrap();
        let victim2 = board_named(&engine, "Victim2").unwrap();
        let card = Commands::AddCard {
            title: "keep".to_string(),
            list: "To Do".to_string(),
            board: Some(victim2.id.clone()),
            description: String::new(),
            assignee: String::new(),
            due: None,
        };
        run(&engine, card, false).unwrap();
        let before = engine.boards().all_boards().unwrap();

        register(&engine, "Intruder");
        let attempts = vec![
            Commands::AddList {
                name: "Injected".to_string(),
                board: Some(victim2.id.clone()),
            },
            Commands::DeleteBoard {
                board: victim.id.clone(),
            },
            Commands::DeleteList {
                list: "Done".to_string(),
                board: Some(victim2.id.clone()),
            },
            Commands::MoveCard {
                card: before[1].lists[0].cards[0].id.clone(),
                target: "Done".to_string(),
                board: Some(victim2.id.clone()),
            },
            Commands::RenameBoard {
                name: "Mine".to_string(),
                board: Some(victim.id.clone()),
            },
            Commands::Show {
                board: Some(victim.id.clone()),
            },
        ];
        for command in attempts {
            assert!(run(&engine, command, false).is_err());
        }
        assert_eq!(engine.boards().all_boards().unwrap(), before);
    }

    #[test]
    fn test_cli_parses_card_commands() {
        let cli = Cli::parse_from([
            "taskboard", "add-card", "Buy milk", "--list", "To Do", "--due", "2024-06-01",
        ]);
        match cli.command {
            Commands::AddCard { title, list, due, board, .. } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(list, "To Do");
                assert_eq!(due, NaiveDate::from_ymd_opt(2024, 6, 1));
                assert!(board.is_none());
            }
            _ => panic!("expected add-card"),
        }
    }

    #[test]
    fn test_cli_rejects_due_with_clear_due() {
        let parsed = Cli::try_parse_from([
            "taskboard", "update-card", "c1", "--list", "l1", "--due", "2024-06-01", "--clear-due",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["taskboard", "boards", "--search", "home", "-v", "--json"]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Boards { search: Some(_) }));
    }
}
