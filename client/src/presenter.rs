//! Presentation Sink - turns user intents into service calls and renders
//! the results.
//!
//! The [`Controller`] holds the form state. Whatever displays the catalog
//! implements [`PresentationSink`]; [`TextSink`] is the line-oriented one
//! used by the CLI.

use crate::service::CatalogService;
use shelf_engine::{
    BookChanges, BookDraft, BookId, BookRecord, FieldIssue, Listing, MutationKind, Outcome,
    Reconciliation,
};
use std::{fmt, io::Write, sync::Arc};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "ok"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Describe the result of a mutation.
    pub fn for_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Committed {
                kind,
                id,
                reconciliation,
            } => {
                let verb = match kind {
                    MutationKind::Create => "added",
                    MutationKind::Update => "updated",
                    MutationKind::Delete => "deleted",
                };
                match reconciliation {
                    Some(Reconciliation::Conflict { server_id }) => Notice::success(format!(
                        "Book {verb} as {id} (remote id {server_id} was already taken)"
                    )),
                    _ => Notice::success(format!("Book {id} {verb}")),
                }
            }
            Outcome::RolledBack { kind, id } => Notice::error(format!(
                "Could not {kind} book {id}; the change was rolled back"
            )),
            Outcome::NoOp => Notice::info("No such book; nothing changed"),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Raw form fields, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub description: String,
}

impl FormInput {
    /// Form fields populated from an existing book.
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            title: record.title.clone(),
            author: record.author.clone(),
            year: record.year.map(|y| y.to_string()).unwrap_or_default(),
            genre: record.genre.clone(),
            description: record.description.clone().unwrap_or_default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    /// Trim every field and parse the year. Blank optional fields become
    /// absent.
    pub fn parse(&self) -> Result<BookDraft, shelf_engine::Error> {
        let year = match self.year.trim() {
            "" => None,
            raw => Some(raw.parse::<i32>().map_err(|_| {
                shelf_engine::Error::Validation(vec![FieldIssue::new(
                    "year",
                    "must be a whole number",
                )])
            })?),
        };

        Ok(BookDraft {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            year,
            genre: non_blank(&self.genre),
            description: non_blank(&self.description),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Something a user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Save the form: update the edit target if any, otherwise create
    Submit(FormInput),
    /// Load a book into the form
    Edit(BookId),
    /// Remove a book once the user has confirmed
    Delete { id: BookId, confirmed: bool },
    Search(String),
    NextPage,
    PrevPage,
    /// Show a page by its one-based number
    GoToPage(usize),
    /// Start a fresh form
    New,
    /// Blank the form fields
    Clear,
    /// Abandon the current edit
    Cancel,
    /// Reload the catalog from the remote seed
    Refresh,
}

/// Receives rendered state.
pub trait PresentationSink {
    fn render(&mut self, listing: &Listing);

    fn notify(&mut self, notice: &Notice);

    /// The form was (re)populated.
    fn fill(&mut self, _form: &FormInput) {}
}

/// Translates intents into catalog service calls.
pub struct Controller<S> {
    service: Arc<CatalogService>,
    sink: S,
    form: FormInput,
}

impl<S: PresentationSink> Controller<S> {
    pub fn new(service: Arc<CatalogService>, sink: S) -> Self {
        Self {
            service,
            sink,
            form: FormInput::default(),
        }
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Render the current page.
    pub async fn show(&mut self) {
        let listing = self.service.page().await;
        self.sink.render(&listing);
    }

    pub async fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::Submit(input) => self.submit(input).await,
            Intent::Edit(id) => match self.service.edit(&id).await {
                Some(record) => {
                    self.form = FormInput::from_record(&record);
                    self.sink.fill(&self.form);
                    self.sink
                        .notify(&Notice::info(format!("Editing \"{}\"", record.title)));
                }
                None => self.sink.notify(&Notice::error(format!("Book {id} not found"))),
            },
            Intent::Delete { id, confirmed } => {
                if !confirmed {
                    self.sink.notify(&Notice::info("Delete cancelled"));
                    return;
                }
                let editing = self.service.edit_target().await.as_ref() == Some(&id);
                let result = self.service.delete(&id).await;
                if editing && matches!(&result, Ok(outcome) if outcome.is_committed()) {
                    self.form = FormInput::default();
                    self.sink.fill(&self.form);
                }
                self.report(result).await;
            }
            Intent::Search(term) => {
                let listing = self.service.search(&term).await;
                self.sink.render(&listing);
                if listing.query.is_some() && listing.is_empty() {
                    self.sink
                        .notify(&Notice::info(format!("No books match \"{}\"", term.trim())));
                }
            }
            Intent::NextPage => {
                let listing = self.service.next_page().await;
                self.sink.render(&listing);
            }
            Intent::PrevPage => {
                let listing = self.service.prev_page().await;
                self.sink.render(&listing);
            }
            Intent::GoToPage(number) => {
                let listing = match number.checked_sub(1) {
                    Some(page) => self.service.go_to_page(page).await,
                    None => None,
                };
                match listing {
                    Some(listing) => self.sink.render(&listing),
                    None => {
                        let count = self.service.page().await.page_count;
                        self.sink.notify(&Notice::error(format!(
                            "Page {number} is out of range (1-{count})"
                        )));
                    }
                }
            }
            Intent::New => {
                self.reset_form().await;
                self.sink.notify(&Notice::info("Ready for a new book"));
            }
            Intent::Clear => {
                self.form = FormInput::default();
                self.sink.fill(&self.form);
                self.sink.notify(&Notice::info("Form cleared"));
            }
            Intent::Cancel => {
                self.reset_form().await;
                self.sink.notify(&Notice::info("Edit cancelled"));
            }
            Intent::Refresh => match self.service.refresh().await {
                Ok(count) => {
                    self.show().await;
                    self.sink
                        .notify(&Notice::success(format!("Loaded {count} books from remote")));
                }
                Err(e) => self.sink.notify(&Notice::error(e.to_string())),
            },
        }
    }

    async fn submit(&mut self, input: FormInput) {
        let draft = match input.parse() {
            Ok(draft) => draft,
            Err(e) => {
                self.form = input;
                self.sink.notify(&Notice::error(e.to_string()));
                return;
            }
        };

        let result = match self.service.edit_target().await {
            Some(id) => self.service.update(&id, BookChanges::from(draft)).await,
            None => self.service.create(draft).await,
        };

        if result.is_ok() {
            self.reset_form().await;
        } else {
            self.form = input;
        }
        self.report(result).await;
    }

    async fn report(&mut self, result: crate::error::Result<Outcome>) {
        match result {
            Ok(outcome) => {
                self.show().await;
                self.sink.notify(&Notice::for_outcome(&outcome));
            }
            Err(e) => self.sink.notify(&Notice::error(e.to_string())),
        }
    }

    async fn reset_form(&mut self) {
        self.form = FormInput::default();
        self.service.clear_edit_target().await;
        self.sink.fill(&self.form);
    }
}

/// Renders listings and notices as plain text lines.
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            tracing::warn!(error = %e, "Could not write output");
        }
    }
}

/// One book as a single line.
pub fn format_book(book: &BookRecord) -> String {
    let mut line = format!("[{}] {}", book.id, book.title);
    if !book.author.is_empty() {
        line.push_str(&format!(" by {}", book.author));
    }
    if let Some(year) = book.year {
        line.push_str(&format!(" ({year})"));
    }
    line.push_str(&format!(" - {}", book.genre));
    line
}

impl<W: Write> PresentationSink for TextSink<W> {
    fn render(&mut self, listing: &Listing) {
        let mut text = String::new();

        if listing.is_empty() {
            text.push_str("No books.\n");
        }
        for book in &listing.items {
            text.push_str(&format_book(book));
            text.push('\n');
        }

        match &listing.query {
            Some(query) => text.push_str(&format!(
                "{} of {} matches for \"{query}\"\n",
                listing.items.len(),
                listing.total
            )),
            None => text.push_str(&format!(
                "Page {}/{} ({} books)\n",
                listing.page + 1,
                listing.page_count,
                listing.total
            )),
        }

        self.emit(&text);
    }

    fn notify(&mut self, notice: &Notice) {
        self.emit(&format!("{notice}\n"));
    }
}
