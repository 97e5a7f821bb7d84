//! View-model equivalent for note screens.

use crate::clock::Clock;
use crate::live::LiveQuery;
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::NoteQuery;
use crate::service::note_service::NoteService;
use crate::service::ServiceError;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by [`NoteSynchronizer`] actions.
#[derive(Debug)]
pub enum SyncError {
    /// An edit was staged or committed with no note open.
    NoCurrentNote,
    Service(ServiceError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCurrentNote => write!(f, "no note is currently open"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoCurrentNote => None,
            Self::Service(err) => Some(err),
        }
    }
}

impl From<ServiceError> for SyncError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

#[derive(Default)]
struct Subscriptions {
    all: Option<JoinHandle<()>>,
    favorites: Option<JoinHandle<()>>,
    current: Option<JoinHandle<()>>,
}

impl Subscriptions {
    fn abort_all(&mut self) {
        for slot in [&mut self.all, &mut self.favorites, &mut self.current] {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Observable note state shared with the UI.
///
/// # Invariants
/// - Snapshots change only on stream emissions, staged edits, or successful writes.
/// - Staged edits are never persisted until [`NoteSynchronizer::commit_edit`].
/// - Dropping the synchronizer cancels every subscription it owns.
pub struct NoteSynchronizer {
    notes: NoteService,
    clock: Arc<dyn Clock>,
    all_notes: Arc<watch::Sender<Vec<Note>>>,
    favorites: Arc<watch::Sender<Vec<Note>>>,
    current: Arc<watch::Sender<Option<Note>>>,
    subscriptions: Mutex<Subscriptions>,
}

impl NoteSynchronizer {
    pub fn new(notes: NoteService, clock: Arc<dyn Clock>) -> Self {
        Self {
            notes,
            clock,
            all_notes: Arc::new(watch::channel(Vec::new()).0),
            favorites: Arc::new(watch::channel(Vec::new()).0),
            current: Arc::new(watch::channel(None).0),
            subscriptions: Mutex::new(Subscriptions::default()),
        }
    }

    pub fn all_notes(&self) -> Vec<Note> {
        self.all_notes.borrow().clone()
    }

    pub fn favorites(&self) -> Vec<Note> {
        self.favorites.borrow().clone()
    }

    pub fn current_note(&self) -> Option<Note> {
        self.current.borrow().clone()
    }

    pub fn subscribe_all(&self) -> watch::Receiver<Vec<Note>> {
        self.all_notes.subscribe()
    }

    pub fn subscribe_favorites(&self) -> watch::Receiver<Vec<Note>> {
        self.favorites.subscribe()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<Note>> {
        self.current.subscribe()
    }

    /// Keeps the full list snapshot in sync with storage.
    pub async fn load_all(&self) -> SyncResult<()> {
        let mut live = self.notes.observe_all().await?;
        replace_if_changed(&self.all_notes, live.current());
        let handle = forward(live, Arc::clone(&self.all_notes));
        replace_task(&mut self.lock_subscriptions().all, handle);
        Ok(())
    }

    /// Keeps the favorites snapshot in sync with storage.
    pub async fn load_favorites(&self) -> SyncResult<()> {
        let mut live = self.notes.observe_favorites().await?;
        replace_if_changed(&self.favorites, live.current());
        let handle = forward(live, Arc::clone(&self.favorites));
        replace_task(&mut self.lock_subscriptions().favorites, handle);
        Ok(())
    }

    /// Opens note `id`; the snapshot follows storage and becomes `None` on delete.
    pub async fn load_one(&self, id: NoteId) -> SyncResult<()> {
        let mut live = self.notes.observe(id).await?;
        self.current.send_replace(live.current());
        let handle = forward(live, Arc::clone(&self.current));
        replace_task(&mut self.lock_subscriptions().current, handle);
        debug!("event=note_open module=state status=ok note_id={id}");
        Ok(())
    }

    /// Opens an unsaved blank note for editing.
    pub fn open_draft(&self) -> Note {
        if let Some(handle) = self.lock_subscriptions().current.take() {
            handle.abort();
        }
        let draft = Note::new("", "", self.clock.now_millis());
        self.current.send_replace(Some(draft.clone()));
        draft
    }

    /// Applies `transform` to the open note in memory only.
    ///
    /// The note id cannot be changed by the transform.
    pub fn stage_edit<F>(&self, transform: F) -> SyncResult<Note>
    where
        F: FnOnce(Note) -> Note,
    {
        let Some(note) = self.current.borrow().clone() else {
            return Err(SyncError::NoCurrentNote);
        };
        let id = note.id;
        let mut staged = transform(note);
        staged.id = id;
        self.current.send_replace(Some(staged.clone()));
        Ok(staged)
    }

    /// Persists the open note, stamping its modification time.
    ///
    /// Drafts are inserted and then followed like [`Self::load_one`].
    pub async fn commit_edit(&self) -> SyncResult<Note> {
        let mut note = self.current_note().ok_or(SyncError::NoCurrentNote)?;
        note.modified_at = self.clock.now_millis().max(note.modified_at);

        if note.is_persisted() {
            self.notes.update(note.clone()).await?;
            self.current.send_replace(Some(note.clone()));
        } else {
            note.id = self.notes.insert(note.clone()).await?;
            self.current.send_replace(Some(note.clone()));
            if let Err(err) = self.load_one(note.id).await {
                warn!(
                    "event=note_open module=state status=error note_id={} error={}",
                    note.id, err
                );
            }
        }

        self.refresh_lists().await;
        Ok(note)
    }

    pub async fn create(&self, note: Note) -> SyncResult<NoteId> {
        let id = self.notes.insert(note).await?;
        self.refresh_lists().await;
        Ok(id)
    }

    pub async fn update(&self, note: Note) -> SyncResult<()> {
        self.notes.update(note).await?;
        self.refresh_lists().await;
        Ok(())
    }

    pub async fn delete(&self, note: &Note) -> SyncResult<()> {
        self.notes.delete(note).await?;
        self.current.send_if_modified(|current| {
            if current.as_ref().is_some_and(|open| open.id == note.id) {
                *current = None;
                true
            } else {
                false
            }
        });
        self.refresh_lists().await;
        Ok(())
    }

    /// Flips the favorite flag; returns the new value.
    pub async fn toggle_favorite(&self, id: NoteId) -> SyncResult<bool> {
        let favorite = self.notes.toggle_favorite(id).await?;
        self.refresh_lists().await;
        Ok(favorite)
    }

    /// Flips Markdown rendering; returns the new value.
    pub async fn toggle_markdown(&self, id: NoteId) -> SyncResult<bool> {
        let enabled = self.notes.toggle_markdown(id).await?;
        self.refresh_lists().await;
        Ok(enabled)
    }

    /// Moves a note into or out of the vault.
    pub async fn set_secret(&self, id: NoteId, secret: bool) -> SyncResult<()> {
        self.notes.set_secret(id, secret).await?;
        self.refresh_lists().await;
        Ok(())
    }

    /// Re-reads the list snapshots once.
    ///
    /// Failures are logged; the write that triggered the refresh already succeeded.
    pub async fn refresh_lists(&self) {
        match self.notes.list(NoteQuery::All).await {
            Ok(all) => replace_if_changed(&self.all_notes, all),
            Err(err) => warn!("event=notes_refresh module=state status=error list=all error={err}"),
        }
        match self.notes.list(NoteQuery::Favorites).await {
            Ok(favorites) => replace_if_changed(&self.favorites, favorites),
            Err(err) => {
                warn!("event=notes_refresh module=state status=error list=favorites error={err}")
            }
        }
    }

    /// Cancels every subscription; snapshots keep their last values.
    pub fn close(&self) {
        self.lock_subscriptions().abort_all();
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Subscriptions> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NoteSynchronizer {
    fn drop(&mut self) {
        self.subscriptions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

fn forward<T>(mut live: LiveQuery<T>, target: Arc<watch::Sender<T>>) -> JoinHandle<()>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(value) = live.changed().await {
            replace_if_changed(&target, value);
        }
    })
}

fn replace_task(slot: &mut Option<JoinHandle<()>>, next: JoinHandle<()>) {
    if let Some(previous) = slot.replace(next) {
        previous.abort();
    }
}

fn replace_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|held| {
        if *held == value {
            false
        } else {
            *held = value;
            true
        }
    });
}
