//! The room list's view model.

use std::sync::Arc;

use confab_session::{ChatClient, RoomId, RoomSummary};
use confab_store::{Binding, StateStore, SubscriptionSet, ViewModel};

/// Everything the room list renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomListState {
    /// Every room in the session, as last reported by the SDK.
    pub rooms: Vec<RoomSummary>,
    /// Search filter, two-way bound.
    pub filter: String,
}

impl RoomListState {
    /// Rooms matching the current filter, in SDK order.
    pub fn visible_rooms(&self) -> Vec<&RoomSummary> {
        let needle = self.filter.to_lowercase();
        self.rooms
            .iter()
            .filter(|room| needle.is_empty() || room.name.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Actions the rendering layer dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListAction {
    /// The user tapped a room.
    SelectRoom(RoomId),
    /// The user opened settings.
    OpenSettings,
    /// The user tapped the secure-backup setup banner.
    OpenSecureBackup,
}

/// Actions the view model emits to its coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListViewModelAction {
    /// Present the given room's timeline.
    SelectRoom(RoomId),
    /// Present the settings screen.
    OpenSettings,
    /// Start the secure backup flow.
    OpenSecureBackup,
}

/// The fields the rendering layer writes directly.
#[derive(Debug, Clone)]
pub struct RoomListBindings {
    /// Search filter text field.
    pub filter: Binding<RoomListState, String>,
}

/// View model behind the room list.
///
/// Subscribes to the SDK's room updates for its whole lifetime; the
/// subscription dies with the view model.
pub struct RoomListViewModel {
    store: StateStore<RoomListState>,
    bindings: RoomListBindings,
    actions: Box<dyn FnMut(RoomListViewModelAction) + Send>,
    subscriptions: SubscriptionSet,
}

impl RoomListViewModel {
    /// Create the view model, seeded from the current room snapshot.
    pub fn new(
        client: &Arc<dyn ChatClient>,
        actions: impl FnMut(RoomListViewModelAction) + Send + 'static,
    ) -> Self {
        let store = StateStore::new(RoomListState {
            rooms: client.room_summaries(),
            filter: String::new(),
        });
        let bindings = RoomListBindings {
            filter: Binding::new(
                &store,
                |state: &RoomListState| state.filter.clone(),
                |state, value| state.filter = value,
            ),
        };

        let mut subscriptions = SubscriptionSet::new();
        let mut updates = client.subscribe_rooms();
        let observer = store.clone();
        subscriptions.spawn(async move {
            while updates.changed().await.is_ok() {
                let rooms = updates.borrow_and_update().clone();
                observer.update(|state| state.rooms = rooms);
            }
        });

        Self { store, bindings, actions: Box::new(actions), subscriptions }
    }

    /// Number of upstream subscriptions this view model holds.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl ViewModel for RoomListViewModel {
    type State = RoomListState;
    type Action = RoomListAction;
    type Bindings = RoomListBindings;

    fn store(&self) -> &StateStore<RoomListState> {
        &self.store
    }

    fn bindings(&self) -> RoomListBindings {
        self.bindings.clone()
    }

    fn process(&mut self, action: RoomListAction) {
        match action {
            RoomListAction::SelectRoom(room_id) => {
                (self.actions)(RoomListViewModelAction::SelectRoom(room_id));
            },
            RoomListAction::OpenSettings => {
                (self.actions)(RoomListViewModelAction::OpenSettings);
            },
            RoomListAction::OpenSecureBackup => {
                (self.actions)(RoomListViewModelAction::OpenSecureBackup);
            },
        }
    }
}
