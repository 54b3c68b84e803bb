//! Browser glue
//!
//! `WebGame` owns the session behind `Rc<RefCell<_>>`, steps it from
//! `requestAnimationFrame`, and performs queued progress calls with `fetch`.
//! The page forwards clicks through the exported methods and reads back
//! presentation events as JSON.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Headers, Request, RequestCredentials, RequestInit, Response, VisibilityState};

use super::storage::{KvStore, LocalStorage, MemoryStorage};
use crate::config::EngineConfig;
use crate::error::RemoteError;
use crate::persistence::{LocalCache, Method, OutgoingRequest, ProgressRequest, ProgressResponse};
use crate::sim::{Coord, PlayerAction, Session, Stage, TickInput, tick};

/// Longest frame step fed to the session (tab switches produce huge gaps)
const MAX_FRAME_MS: u64 = 250;

struct Inner {
    session: Session,
    input: TickInput,
    last_time: f64,
    progress_url: String,
    /// Listeners attached and frame loop running
    started: bool,
}

#[wasm_bindgen]
pub struct WebGame {
    inner: Rc<RefCell<Inner>>,
}

#[wasm_bindgen]
impl WebGame {
    /// Create a game for `player` (falls back to the configured identity)
    #[wasm_bindgen(constructor)]
    pub fn new(player: Option<String>) -> WebGame {
        let config = EngineConfig::load();
        let player = player
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| config.default_player.clone());

        let store: Box<dyn KvStore> = match LocalStorage::open() {
            Some(storage) => Box::new(storage),
            None => {
                log::warn!("LocalStorage unavailable, progress cache will not survive reloads");
                Box::new(MemoryStorage::new())
            }
        };

        let seed = js_sys::Date::now() as u64;
        let progress_url = config.progress_url.clone();
        let session = Session::new(config, LocalCache::new(store, player), seed);
        log::info!("Game initialized with seed: {}", seed);

        WebGame {
            inner: Rc::new(RefCell::new(Inner {
                session,
                input: TickInput::default(),
                last_time: 0.0,
                progress_url,
                started: false,
            })),
        }
    }

    /// Start the frame loop and page listeners. Later calls do nothing.
    pub fn run(&self) {
        if std::mem::replace(&mut self.inner.borrow_mut().started, true) {
            log::warn!("Game loop already running");
            return;
        }
        setup_visibility_listener(self.inner.clone());
        setup_pagehide_listener(self.inner.clone());
        dispatch_outgoing(&self.inner);
        request_animation_frame(self.inner.clone());
    }

    /// Presentation events since the last call, as a JSON array
    pub fn drain_events(&self) -> String {
        let events = self.inner.borrow_mut().session.drain_events();
        serde_json::to_string(&events).unwrap_or_else(|e| {
            log::error!("Failed to encode events: {}", e);
            "[]".to_string()
        })
    }

    pub fn stage_level(&self) -> u8 {
        self.inner.borrow().session.stage().level()
    }

    pub fn start_game(&self) {
        self.push(PlayerAction::StartGame);
    }

    pub fn go_to(&self, level: u8) {
        self.push(PlayerAction::GoTo(Stage::from_level(level)));
    }

    pub fn open_puzzle(&self) {
        self.push(PlayerAction::OpenPuzzle);
    }

    pub fn leave_puzzle(&self) {
        self.push(PlayerAction::LeavePuzzle);
    }

    pub fn examine_clue(&self) {
        self.push(PlayerAction::ExamineClue);
    }

    pub fn collect_item(&self, item: u32) {
        self.push(PlayerAction::CollectItem(item));
    }

    pub fn rotate_ring(&self, ring: usize) {
        self.push(PlayerAction::RotateRing(ring));
    }

    pub fn check_lock(&self) {
        self.push(PlayerAction::CheckLock);
    }

    pub fn toggle_valve(&self, valve: usize) {
        self.push(PlayerAction::ToggleValve(valve));
    }

    pub fn activate_valves(&self) {
        self.push(PlayerAction::ActivateValves);
    }

    pub fn toggle_gear(&self, row: usize, col: usize) {
        self.push(PlayerAction::ToggleGear(Coord::new(row, col)));
    }

    pub fn run_gears(&self) {
        self.push(PlayerAction::RunGears);
    }

    pub fn reset_game(&self) {
        self.push(PlayerAction::ResetGame);
    }
}

impl WebGame {
    /// Queue an action for the next frame; repeated clicks within a frame
    /// collapse into one
    fn push(&self, action: PlayerAction) {
        let mut inner = self.inner.borrow_mut();
        if !inner.input.actions.contains(&action) {
            inner.input.actions.push(action);
        }
    }
}

fn request_animation_frame(inner: Rc<RefCell<Inner>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        game_loop(inner, time);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn game_loop(inner: Rc<RefCell<Inner>>, time: f64) {
    {
        let mut guard = inner.borrow_mut();
        let state = &mut *guard;

        let dt_ms = if state.last_time > 0.0 {
            ((time - state.last_time).max(0.0) as u64).min(MAX_FRAME_MS)
        } else {
            0
        };
        state.last_time = time;

        let input = std::mem::take(&mut state.input);
        tick(&mut state.session, &input, dt_ms);
    }

    dispatch_outgoing(&inner);
    request_animation_frame(inner);
}

/// Send every queued progress call; results are reported asynchronously
fn dispatch_outgoing(inner: &Rc<RefCell<Inner>>) {
    let (outgoing, url) = {
        let mut state = inner.borrow_mut();
        (state.session.take_outgoing(), state.progress_url.clone())
    };

    for OutgoingRequest { id, request } in outgoing {
        let inner = inner.clone();
        let url = url.clone();
        spawn_local(async move {
            let result = fetch_progress(&url, &request).await;
            inner.borrow_mut().session.on_remote_response(id, result);
        });
    }
}

async fn fetch_progress(
    url: &str,
    request: &ProgressRequest,
) -> Result<ProgressResponse, RemoteError> {
    let transport = |e: JsValue| RemoteError::Transport(format!("{:?}", e));

    let opts = RequestInit::new();
    opts.set_credentials(RequestCredentials::SameOrigin);
    match request.method() {
        Method::Get => opts.set_method("GET"),
        Method::Post => {
            opts.set_method("POST");
            let headers = Headers::new().map_err(transport)?;
            headers
                .set("Content-Type", "application/json")
                .map_err(transport)?;
            opts.set_headers(&headers);
            let body = request.body().unwrap_or_default().to_string();
            opts.set_body(&JsValue::from_str(&body));
        }
    }

    let req = Request::new_with_str_and_init(url, &opts).map_err(transport)?;
    let window = web_sys::window().ok_or_else(|| RemoteError::Transport("no window".into()))?;
    let resp: Response = JsFuture::from(window.fetch_with_request(&req))
        .await
        .map_err(transport)?
        .dyn_into()
        .map_err(transport)?;

    if !resp.ok() {
        return Err(RemoteError::Status(resp.status()));
    }

    let text = JsFuture::from(resp.text().map_err(transport)?)
        .await
        .map_err(transport)?
        .as_string()
        .ok_or_else(|| RemoteError::Malformed("response body is not text".into()))?;
    ProgressResponse::from_json(&text)
}

fn setup_visibility_listener(inner: Rc<RefCell<Inner>>) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let doc = document.clone();
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
        let visible = doc.visibility_state() == VisibilityState::Visible;
        let mut state = inner.borrow_mut();
        state.input.actions.push(PlayerAction::SetSceneVisible(visible));
        // Reset frame timing so the hidden gap is not replayed
        state.last_time = 0.0;
    });
    let _ = document
        .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn setup_pagehide_listener(inner: Rc<RefCell<Inner>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
        inner.borrow_mut().session.shutdown();
        dispatch_outgoing(&inner);
    });
    let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
    closure.forget();
}
