//! REALMS command-line front-end
//!
//! An interactive prompt that drives a running `realmsd` through
//! [`RealmsClient`].

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use realms::{
    client::{ClientError, ClientResult, RealmsClient},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        record::BorrowRecord,
        user::{CreateUser, Identity, PrivilegeLevel, UpdateUser},
    },
};

/// REALMS - interactive client for the library management server
#[derive(Parser, Debug)]
#[command(name = "realms")]
#[command(version)]
#[command(about = "Interactive terminal for a REALMS server", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(short = 'u', long = "url", default_value = "http://localhost:7274")]
    url: String,

    /// Execute one command and exit
    #[arg(short = 'c', long = "command")]
    command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Exit,
    Login,
    Logout,
    Status,
    Me,
    ShowBooks,
    ShowBook(Option<u32>),
    FindBooks,
    AddBook,
    UpdateBook(Option<u32>),
    RemoveBook(Option<u32>),
    ShowUsers,
    ShowUser(Option<u32>),
    AddUser,
    UpdateUser(Option<u32>),
    RemoveUser(Option<u32>),
    BorrowBook(Option<u32>, Option<DateTime<Utc>>),
    ReturnBook(Option<u32>),
    CheckDeadline(Option<u32>),
    ExtendDeadline(Option<u32>),
    ShowList,
    ShowOverdue,
    ShowHistory,
}

impl Command {
    /// `Ok(None)` for a blank line
    fn parse(line: &str) -> Result<Option<Command>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let id = |raw: Option<&&str>| -> Result<Option<u32>, String> {
            raw.map(|s| s.parse::<u32>().map_err(|_| format!("Invalid ID: {}", s)))
                .transpose()
        };

        let command = match words.as_slice() {
            [] => return Ok(None),
            ["help"] => Command::Help,
            ["exit"] | ["quit"] => Command::Exit,
            ["login"] => Command::Login,
            ["logout"] => Command::Logout,
            ["status"] => Command::Status,
            ["me"] => Command::Me,
            ["show", "books"] => Command::ShowBooks,
            ["show", "book", rest @ ..] if rest.len() <= 1 => Command::ShowBook(id(rest.first())?),
            ["find", "books"] => Command::FindBooks,
            ["add", "book"] => Command::AddBook,
            ["update", "book", rest @ ..] if rest.len() <= 1 => Command::UpdateBook(id(rest.first())?),
            ["remove", "book", rest @ ..] if rest.len() <= 1 => Command::RemoveBook(id(rest.first())?),
            ["show", "users"] => Command::ShowUsers,
            ["show", "user", rest @ ..] if rest.len() <= 1 => Command::ShowUser(id(rest.first())?),
            ["add", "user"] => Command::AddUser,
            ["update", "user", rest @ ..] if rest.len() <= 1 => Command::UpdateUser(id(rest.first())?),
            ["remove", "user", rest @ ..] if rest.len() <= 1 => Command::RemoveUser(id(rest.first())?),
            ["borrow", "book", rest @ ..] if rest.len() <= 2 => {
                let date = rest.get(1).map(|raw| parse_date(raw)).transpose()?;
                Command::BorrowBook(id(rest.first())?, date)
            }
            ["return", "book", rest @ ..] if rest.len() <= 1 => Command::ReturnBook(id(rest.first())?),
            ["check", "ddl", rest @ ..] if rest.len() <= 1 => Command::CheckDeadline(id(rest.first())?),
            ["extend", "ddl", rest @ ..] if rest.len() <= 1 => Command::ExtendDeadline(id(rest.first())?),
            ["show", "list"] => Command::ShowList,
            ["show", "overdue"] => Command::ShowOverdue,
            ["show", "history"] => Command::ShowHistory,
            _ => {
                return Err(
                    "Invalid operation! Check the manual using the command 'help'.".to_string(),
                )
            }
        };
        Ok(Some(command))
    }
}

/// Accepts `yyyy-mm-dd` (midnight UTC) or a full RFC 3339 timestamp
fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("Wrong date format: {} (expected yyyy-mm-dd)", raw))
}

/// Line-oriented input shared by the command loop and field prompts
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input
    async fn ask(&mut self, label: &str) -> Option<String> {
        print!("{}", label);
        std::io::stdout().flush().ok();
        self.lines.next_line().await.ok().flatten()
    }

    async fn ask_id(&mut self, given: Option<u32>, label: &str) -> Option<u32> {
        if given.is_some() {
            return given;
        }
        let raw = self.ask(label).await?;
        match raw.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                println!("Invalid ID");
                None
            }
        }
    }

    /// Empty answers become `None`
    async fn ask_optional(&mut self, label: &str) -> Option<String> {
        self.ask(label)
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

struct Shell {
    client: RealmsClient,
    prompt: Prompt,
}

impl Shell {
    /// False once the user asked to leave
    async fn run(&mut self, command: Command) -> bool {
        let result = match command {
            Command::Exit => return false,
            Command::Help => {
                print_help();
                Ok(())
            }
            command => self.dispatch(command).await,
        };

        if let Err(e) = result {
            match e {
                ClientError::Http(e) if e.is_connect() => {
                    println!("cli: failed to make an http request, did you start realmsd?")
                }
                other => println!("{}", other),
            }
        }
        true
    }

    async fn dispatch(&mut self, command: Command) -> ClientResult<()> {
        match command {
            Command::Login => {
                let Some(username) = self.prompt.ask("Username: ").await else {
                    return Ok(());
                };
                let Some(password) = self.prompt.ask("Password: ").await else {
                    return Ok(());
                };
                let identity = self.client.login(username.trim(), &password).await?;
                println!("Welcome, {}!", identity.username);
            }
            Command::Logout => {
                self.client.logout().await?;
                println!("Logged out");
            }
            Command::Status => {
                if self.client.status().await? {
                    println!("Logged in");
                } else {
                    println!("Not logged in");
                }
            }
            Command::Me => print_users(&[self.client.me().await?]),
            Command::ShowBooks => print_books(&self.client.list_books().await?),
            Command::ShowBook(id) => {
                if let Some(id) = self.prompt.ask_id(id, "Book ID: ").await {
                    print_books(&[self.client.get_book(id).await?]);
                }
            }
            Command::FindBooks => {
                println!("(Leave a field blank to ignore it)");
                let query = BookQuery {
                    title: self.prompt.ask_optional("Title contains: ").await,
                    author: self.prompt.ask_optional("Author: ").await,
                    isbn: self.prompt.ask_optional("ISBN: ").await,
                };
                print_books(&self.client.find_books(&query).await?);
            }
            Command::AddBook => {
                let book = CreateBook {
                    title: self.prompt.ask("Title: ").await.unwrap_or_default(),
                    author: self.prompt.ask("Author: ").await.unwrap_or_default(),
                    publisher: self.prompt.ask("Publisher: ").await.unwrap_or_default(),
                    isbn: self.prompt.ask("ISBN: ").await.unwrap_or_default(),
                };
                let book = self.client.add_book(&book).await?;
                println!("Added book {}", book.id);
            }
            Command::UpdateBook(id) => {
                let Some(id) = self.prompt.ask_id(id, "Book ID: ").await else {
                    return Ok(());
                };
                println!("(Leave a field blank to keep it)");
                let patch = UpdateBook {
                    title: self.prompt.ask_optional("Title: ").await,
                    author: self.prompt.ask_optional("Author: ").await,
                    publisher: self.prompt.ask_optional("Publisher: ").await,
                    isbn: self.prompt.ask_optional("ISBN: ").await,
                };
                print_books(&[self.client.update_book(id, &patch).await?]);
            }
            Command::RemoveBook(id) => {
                let Some(id) = self.prompt.ask_id(id, "Book ID: ").await else {
                    return Ok(());
                };
                let message = self.prompt.ask_optional("Explanation (optional): ").await;
                self.client.remove_book(id, message).await?;
                println!("Removed book {}", id);
            }
            Command::ShowUsers => print_users(&self.client.list_users().await?),
            Command::ShowUser(id) => {
                if let Some(id) = self.prompt.ask_id(id, "User ID: ").await {
                    print_users(&[self.client.get_user(id).await?]);
                }
            }
            Command::AddUser => {
                let username = self.prompt.ask("Username: ").await.unwrap_or_default();
                let password = self.prompt.ask("Password: ").await.unwrap_or_default();
                let Some(level) = self.ask_level("Level (1 user, 2 admin, 3 super admin): ").await
                else {
                    return Ok(());
                };
                let user = self
                    .client
                    .add_user(&CreateUser { username, password, level })
                    .await?;
                println!("Added user {}", user.id);
            }
            Command::UpdateUser(id) => {
                let Some(id) = self.prompt.ask_id(id, "User ID: ").await else {
                    return Ok(());
                };
                println!("(Leave a field blank to keep it)");
                let password = self.prompt.ask_optional("New password: ").await;
                let level = match self.prompt.ask_optional("Level (0-3): ").await {
                    Some(raw) => match parse_level(&raw) {
                        Some(level) => Some(level),
                        None => {
                            println!("Invalid level");
                            return Ok(());
                        }
                    },
                    None => None,
                };
                print_users(&[self.client.update_user(id, &UpdateUser { password, level }).await?]);
            }
            Command::RemoveUser(id) => {
                if let Some(id) = self.prompt.ask_id(id, "User ID: ").await {
                    self.client.remove_user(id).await?;
                    println!("Removed user {}", id);
                }
            }
            Command::BorrowBook(id, date) => {
                if let Some(id) = self.prompt.ask_id(id, "Book ID: ").await {
                    let record = self.client.borrow_book(id, date).await?;
                    println!("Borrowed book {}, return it by {}", id, record.return_date);
                }
            }
            Command::ReturnBook(id) => {
                if let Some(id) = self.prompt.ask_id(id, "Book ID: ").await {
                    self.client.return_book(id).await?;
                    println!("Returned book {}", id);
                }
            }
            Command::CheckDeadline(id) => {
                if let Some(id) = self.prompt.ask_id(id, "Book ID: ").await {
                    print_records(&[self.client.check_deadline(id).await?], false);
                }
            }
            Command::ExtendDeadline(id) => {
                if let Some(id) = self.prompt.ask_id(id, "Book ID: ").await {
                    let record = self.client.extend_deadline(id).await?;
                    println!("New deadline: {}", record.return_date);
                }
            }
            Command::ShowList => print_records(&self.client.list_borrowed().await?, false),
            Command::ShowOverdue => print_records(&self.client.list_overdue().await?, false),
            Command::ShowHistory => print_records(&self.client.list_history().await?, true),
            Command::Help | Command::Exit => {}
        }
        Ok(())
    }

    async fn ask_level(&mut self, label: &str) -> Option<PrivilegeLevel> {
        let raw = self.prompt.ask(label).await?;
        let level = parse_level(&raw);
        if level.is_none() {
            println!("Invalid level");
        }
        level
    }
}

fn parse_level(raw: &str) -> Option<PrivilegeLevel> {
    raw.trim()
        .parse::<i16>()
        .ok()
        .and_then(|n| PrivilegeLevel::try_from(n).ok())
}

fn print_help() {
    println!("COMMANDS:");
    let sections: [(&str, &[(&str, &str)]); 3] = [
        (
            "Public:",
            &[
                ("help", "Shows a list of commands"),
                ("exit", "Quit"),
                ("login", "Log in to your library account"),
                ("logout", "Log out of your library account"),
                ("status", "Shows the current login status"),
                ("show books", "Shows all books in the library"),
                ("show book", "Shows the book of given ID"),
                ("find books", "Finds books by title / author / ISBN"),
            ],
        ),
        (
            "Admin privilege required:",
            &[
                ("add book", "Adds a new book to the library"),
                ("update book", "Updates data of a book"),
                ("remove book", "Removes a book from the library"),
                ("add user", "Adds a new user to the database"),
                ("update user", "Updates data of a user"),
                ("remove user", "Removes a user from the database"),
                ("show users", "Shows all users in the library"),
                ("show user", "Shows the user of given ID"),
            ],
        ),
        (
            "User privilege required:",
            &[
                ("me", "Shows the current logged-in user"),
                ("borrow book", "Borrows a book, optionally as of a date (yyyy-mm-dd)"),
                ("return book", "Returns a book to the library"),
                ("check ddl", "Checks the deadline to return a book"),
                ("extend ddl", "Extends the deadline to return a book"),
                ("show list", "Shows all books that you've borrowed"),
                ("show overdue", "Shows all overdue books that you've borrowed"),
                ("show history", "Shows all records"),
            ],
        ),
    ];

    for (title, commands) in sections {
        println!("   {}", title);
        for (command, usage) in commands {
            println!("      {:<15}{}", command, usage);
        }
        println!();
    }
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("No books found");
        return;
    }
    println!("{:<6}{:<32}{:<24}{:<20}{}", "ID", "Title", "Author", "Publisher", "ISBN");
    println!("{}", "-".repeat(96));
    for book in books {
        println!(
            "{:<6}{:<32}{:<24}{:<20}{}",
            book.id, book.title, book.author, book.publisher, book.isbn
        );
    }
}

fn print_users(users: &[Identity]) {
    if users.is_empty() {
        println!("No users found");
        return;
    }
    println!("{:<6}{:<24}{}", "ID", "Username", "Level");
    println!("{}", "-".repeat(48));
    for user in users {
        println!("{:<6}{:<24}{}", user.id, user.username, user.level);
    }
}

fn print_records(records: &[BorrowRecord], with_returned: bool) {
    if records.is_empty() {
        println!("No records found");
        return;
    }
    let date = |d: DateTime<Utc>| d.format("%Y-%m-%d %H:%M:%S").to_string();

    print!("{:<6}{:<10}{:<22}{:<10}", "ID", "Book ID", "Return Date", "Extended");
    if with_returned {
        println!("Returned Date");
        println!("{}", "-".repeat(70));
    } else {
        println!();
        println!("{}", "-".repeat(48));
    }
    for record in records {
        print!(
            "{:<6}{:<10}{:<22}{:<10}",
            record.id,
            record.book_id,
            date(record.return_date),
            record.extend_times
        );
        if with_returned {
            match record.real_return_date() {
                Some(returned) => println!("{}", date(returned)),
                None => println!("-"),
            }
        } else {
            println!();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = RealmsClient::new(&cli.url)?;
    let mut shell = Shell {
        client,
        prompt: Prompt::new(),
    };

    if let Some(line) = cli.command {
        match Command::parse(&line) {
            Ok(Some(command)) => {
                shell.run(command).await;
            }
            Ok(None) => {}
            Err(message) => println!("{}", message),
        }
        return Ok(());
    }

    println!("Welcome to REALMS! Check the manual using the command 'help'.");
    loop {
        let Some(line) = shell.prompt.ask("> ").await else {
            break;
        };
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if !shell.run(command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("{}", message),
        }
    }
    println!("Bye!");
    Ok(())
}
