//! End-to-end flow tests.
//!
//! Everything runs against the real coordinators with scripted collaborators:
//! cold start, login success and failure, deep links vs organic navigation,
//! settings write-through, secure backup setup, sign-out, and the
//! no-activity-after-stop guarantees.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use confab_flows::{
    AppCoordinator, AppRoute, AppState, AuthEvent, AuthState, AuthenticationFlowCoordinator,
    BackupScreenAction, BackupScreenViewModel, Coordinator, EventSink, FlowMessage,
    LoginScreenAction, LoginScreenViewModel, Navigator, NoopPresenter, RoomListAction,
    RoomListViewModel, Screen, ScreenKind, SessionEvent, SettingsScreenAction,
    SettingsScreenViewModel, navigator,
};
use confab_harness::{MemorySettings, RecordingPresenter, ScriptedClient, settle};
use confab_session::{ChatClient, ClientError, Credentials, RoomId, SettingsStore};
use confab_store::Context;
use tokio::sync::mpsc::UnboundedReceiver;

type App = (AppCoordinator, UnboundedReceiver<FlowMessage>, RecordingPresenter, Arc<MemorySettings>);

fn build_app(client: &Arc<ScriptedClient>) -> App {
    let presenter = RecordingPresenter::new();
    let settings = Arc::new(MemorySettings::new());
    let (app, messages) = AppCoordinator::new(
        Arc::clone(client) as Arc<dyn ChatClient>,
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
        Box::new(presenter.clone()),
    );
    (app, messages, presenter, settings)
}

async fn signed_in_app(client: &Arc<ScriptedClient>) -> App {
    client.set_has_session(true);
    let (mut app, mut messages, presenter, settings) = build_app(client);
    app.start();
    settle(&mut app, &mut messages).await;
    assert_eq!(app.state(), AppState::SignedIn);
    (app, messages, presenter, settings)
}

fn login_context(navigator: &Navigator) -> Context<LoginScreenViewModel> {
    let nav = navigator.lock().unwrap();
    match nav.stack().first() {
        Some(Screen::Login(context)) => context.clone(),
        other => panic!("expected login root, found {:?}", other.map(Screen::kind)),
    }
}

fn room_list_context(navigator: &Navigator) -> Context<RoomListViewModel> {
    let nav = navigator.lock().unwrap();
    match nav.stack().first() {
        Some(Screen::RoomList(context)) => context.clone(),
        other => panic!("expected room list root, found {:?}", other.map(Screen::kind)),
    }
}

fn settings_context(navigator: &Navigator) -> Context<SettingsScreenViewModel> {
    let nav = navigator.lock().unwrap();
    match nav.stack().last() {
        Some(Screen::Settings(context)) => context.clone(),
        other => panic!("expected settings on top, found {:?}", other.map(Screen::kind)),
    }
}

fn backup_sheet_context(navigator: &Navigator) -> Context<BackupScreenViewModel> {
    let nav = navigator.lock().unwrap();
    match nav.sheet() {
        Some(Screen::SecureBackupIntro(context) | Screen::SecureBackupKey(context)) => {
            context.clone()
        },
        other => panic!("expected backup sheet, found {:?}", other.map(Screen::kind)),
    }
}

fn submit_login(context: &Context<LoginScreenViewModel>, username: &str, password: &str) {
    context.bindings().username.set(username.into());
    context.bindings().password.set(password.into());
    context.send(LoginScreenAction::Submit);
}

#[tokio::test]
async fn cold_start_mounts_the_login_screen() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = build_app(&client);

    app.start();
    settle(&mut app, &mut messages).await;

    assert_eq!(app.state(), AppState::SignedOut);
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::Login]);
}

#[tokio::test]
async fn login_success_swaps_to_the_room_list() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = build_app(&client);
    app.start();
    settle(&mut app, &mut messages).await;

    let login = login_context(&app.navigator());
    submit_login(&login, "alice", "secret");
    assert!(login.state().submitting);

    settle(&mut app, &mut messages).await;

    assert_eq!(app.state(), AppState::SignedIn);
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::RoomList]);
    // The login view model went down with its flow.
    assert!(!login.is_live());
}

#[tokio::test]
async fn login_failure_surfaces_an_alert_and_retry_is_explicit() {
    let client = Arc::new(ScriptedClient::new());
    client.queue_login(Err(ClientError::InvalidCredentials));
    let (mut app, mut messages, _presenter, _settings) = build_app(&client);
    app.start();
    settle(&mut app, &mut messages).await;

    let login = login_context(&app.navigator());
    submit_login(&login, "alice", "wrong");
    settle(&mut app, &mut messages).await;

    // Still signed out, screen still mounted, form re-enabled.
    assert_eq!(app.state(), AppState::SignedOut);
    let state = login.state();
    assert_eq!(state.alert.as_deref(), Some("Incorrect username or password."));
    assert!(!state.submitting);

    // The retry is a fresh submission, not an automatic one.
    assert_eq!(client.login_calls(), 1);
    login.send(LoginScreenAction::Submit);
    settle(&mut app, &mut messages).await;
    assert_eq!(client.login_calls(), 2);
    assert_eq!(app.state(), AppState::SignedIn);
}

#[tokio::test]
async fn empty_credentials_never_reach_the_client() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, _presenter, _settings) = build_app(&client);
    app.start();
    settle(&mut app, &mut messages).await;

    let login = login_context(&app.navigator());
    login.send(LoginScreenAction::Submit);
    settle(&mut app, &mut messages).await;

    assert_eq!(client.login_calls(), 0);
    assert_eq!(app.state(), AppState::SignedOut);
    assert_eq!(login.state().alert.as_deref(), Some("Enter a username and password."));
    assert!(!login.state().submitting);
}

#[tokio::test]
async fn restore_failure_falls_back_to_login() {
    let client = Arc::new(ScriptedClient::new());
    client.set_has_session(true);
    client.queue_restore(Err(ClientError::Network("offline".into())));
    let (mut app, mut messages, presenter, _settings) = build_app(&client);

    app.start();
    settle(&mut app, &mut messages).await;

    assert_eq!(app.state(), AppState::SignedOut);
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::Login]);
}

#[tokio::test]
async fn deep_link_and_organic_selection_mount_the_same_screens() {
    let client = Arc::new(ScriptedClient::new());
    client.push_rooms(vec![ScriptedClient::summary("!rust", "Rust people")]);

    let (mut linked, mut linked_messages, linked_presenter, _s1) = signed_in_app(&client).await;
    linked.handle_route(AppRoute::Room(RoomId::from("!rust")));
    settle(&mut linked, &mut linked_messages).await;

    let (mut tapped, mut tapped_messages, tapped_presenter, _s2) = signed_in_app(&client).await;
    let room_list = room_list_context(&tapped.navigator());
    room_list.send(RoomListAction::SelectRoom(RoomId::from("!rust")));
    settle(&mut tapped, &mut tapped_messages).await;

    let expected = vec![ScreenKind::RoomList, ScreenKind::RoomTimeline];
    assert_eq!(linked_presenter.last().unwrap().stack, expected);
    assert_eq!(linked_presenter.last(), tapped_presenter.last());
}

#[tokio::test]
async fn deep_link_before_sign_in_is_dropped() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = build_app(&client);
    app.start();
    settle(&mut app, &mut messages).await;

    app.handle_route(AppRoute::Room(RoomId::from("!rust")));
    settle(&mut app, &mut messages).await;

    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::Login]);
}

#[tokio::test]
async fn reselecting_a_room_replaces_the_timeline() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;

    app.handle_route(AppRoute::Room(RoomId::from("!a")));
    app.handle_route(AppRoute::Room(RoomId::from("!b")));
    settle(&mut app, &mut messages).await;

    assert_eq!(
        presenter.last().unwrap().stack,
        vec![ScreenKind::RoomList, ScreenKind::RoomTimeline]
    );

    app.sink().send(SessionEvent::DeselectRoom);
    settle(&mut app, &mut messages).await;
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::RoomList]);
}

#[tokio::test]
async fn room_updates_reach_the_room_list_while_it_lives() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, _presenter, _settings) = signed_in_app(&client).await;
    let room_list = room_list_context(&app.navigator());
    assert!(room_list.state().rooms.is_empty());

    client.push_rooms(vec![ScriptedClient::summary("!rust", "Rust people")]);
    settle(&mut app, &mut messages).await;

    assert_eq!(room_list.state().rooms.len(), 1);

    room_list.bindings().filter.set("cook".into());
    assert!(room_list.state().visible_rooms().is_empty());
}

#[tokio::test]
async fn settings_toggles_write_through_and_observe_external_changes() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, _presenter, settings) = signed_in_app(&client).await;

    app.handle_route(AppRoute::Settings);
    settle(&mut app, &mut messages).await;
    let context = settings_context(&app.navigator());

    // Binding writes bypass process() but land in persisted settings.
    context.bindings().notifications_enabled.set(false);
    assert!(!settings.settings().notifications_enabled);

    // Changes made elsewhere show up on the screen.
    let mut external = settings.settings();
    external.developer_mode = true;
    settings.replace(external);
    settle(&mut app, &mut messages).await;
    assert!(context.state().settings.developer_mode);
}

#[tokio::test]
async fn dismissing_settings_returns_to_the_selected_room() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;
    app.handle_route(AppRoute::Room(RoomId::from("!rust")));
    app.handle_route(AppRoute::Settings);
    settle(&mut app, &mut messages).await;

    let context = settings_context(&app.navigator());
    context.send(SettingsScreenAction::Done);
    settle(&mut app, &mut messages).await;

    assert_eq!(
        presenter.last().unwrap().stack,
        vec![ScreenKind::RoomList, ScreenKind::RoomTimeline]
    );
    assert!(!context.is_live());
}

#[tokio::test]
async fn secure_backup_happy_path() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;

    app.handle_route(AppRoute::SecureBackup);
    settle(&mut app, &mut messages).await;
    assert_eq!(presenter.last().unwrap().sheet, Some(ScreenKind::SecureBackupIntro));

    let sheet = backup_sheet_context(&app.navigator());
    sheet.send(BackupScreenAction::Continue);
    settle(&mut app, &mut messages).await;

    assert_eq!(presenter.last().unwrap().sheet, Some(ScreenKind::SecureBackupKey));
    assert!(sheet.state().recovery_key.is_some());

    sheet.bindings().saved_confirmed.set(true);
    sheet.send(BackupScreenAction::Acknowledge);
    settle(&mut app, &mut messages).await;

    assert_eq!(presenter.last().unwrap().sheet, None);
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::RoomList]);
}

#[tokio::test]
async fn backup_failure_stays_on_the_intro_for_retry() {
    let client = Arc::new(ScriptedClient::new());
    client.queue_backup(Err(ClientError::BackupExists));
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;
    app.handle_route(AppRoute::SecureBackup);
    settle(&mut app, &mut messages).await;

    let sheet = backup_sheet_context(&app.navigator());
    sheet.send(BackupScreenAction::Continue);
    settle(&mut app, &mut messages).await;

    assert_eq!(presenter.last().unwrap().sheet, Some(ScreenKind::SecureBackupIntro));
    assert_eq!(
        sheet.state().alert.as_deref(),
        Some("Key backup is already enabled for this account.")
    );
    assert_eq!(client.backup_calls(), 1);
}

#[tokio::test]
async fn cancelled_backup_dismisses_and_goes_quiet() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;
    app.handle_route(AppRoute::SecureBackup);
    settle(&mut app, &mut messages).await;

    let sheet = backup_sheet_context(&app.navigator());
    sheet.send(BackupScreenAction::Cancel);
    settle(&mut app, &mut messages).await;

    assert_eq!(presenter.last().unwrap().sheet, None);

    // The sheet's view model is gone; a second cancel is a safe no-op.
    assert!(!sheet.is_live());
    sheet.send(BackupScreenAction::Cancel);
    settle(&mut app, &mut messages).await;
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::RoomList]);
}

#[tokio::test]
async fn sign_out_tears_down_the_session_and_returns_to_login() {
    let client = Arc::new(ScriptedClient::new());
    let (mut app, mut messages, presenter, _settings) = signed_in_app(&client).await;
    let room_list = room_list_context(&app.navigator());
    app.handle_route(AppRoute::Settings);
    settle(&mut app, &mut messages).await;
    let settings_screen = settings_context(&app.navigator());

    settings_screen.send(SettingsScreenAction::SignOut);
    settle(&mut app, &mut messages).await;

    assert_eq!(app.state(), AppState::SignedOut);
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::Login]);

    // Every session-flow context is inert and stray events go nowhere.
    assert!(!room_list.is_live());
    assert!(!settings_screen.is_live());
    settings_screen.send(SettingsScreenAction::Done);
    app.sink().send(SessionEvent::ShowSettings);
    settle(&mut app, &mut messages).await;
    assert_eq!(presenter.last().unwrap().stack, vec![ScreenKind::Login]);
}

#[tokio::test]
async fn stopped_auth_flow_never_fires_its_completion() {
    let client = Arc::new(ScriptedClient::new());
    client.pause();
    let (sink, mut messages) = EventSink::channel();
    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);

    let mut flow = AuthenticationFlowCoordinator::new(
        Arc::clone(&client) as Arc<dyn ChatClient>,
        navigator(Box::new(NoopPresenter)),
        sink,
        move |_| flag.store(true, Ordering::SeqCst),
    );
    flow.start();
    flow.process_event(AuthEvent::CredentialsSubmitted(Credentials {
        username: "alice".into(),
        password: "secret".into(),
    }));
    assert_eq!(flow.state(), AuthState::Authenticating);

    flow.stop();
    client.resolve(1);
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }

    // The in-flight login was aborted, so nothing came back.
    assert!(messages.try_recv().is_err());

    // Even a result delivered by hand completes no one.
    flow.process_event(AuthEvent::AuthSucceeded(ScriptedClient::default_session()));
    assert!(!completed.load(Ordering::SeqCst));
}
