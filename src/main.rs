//! Hawkins Escape entry point
//!
//! In the browser this drives the session from `requestAnimationFrame` and
//! renders into plain DOM. Natively it plays a short headless run and logs
//! what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::fmt::Write as _;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlInputElement, KeyboardEvent, MouseEvent};

    use hawkins_escape::audio::AudioManager;
    use hawkins_escape::highscores::{self, HighScoreQuery, client};
    use hawkins_escape::sim::grid::GRID_SIZE;
    use hawkins_escape::sim::shooter::{BOSS_SIZE, ENEMY_SIZE, PLAYER_SIZE};
    use hawkins_escape::sim::{Direction, GhostMode, MazeLayout, Position, ShooterInput, Stage};
    use hawkins_escape::{ActiveLevel, Difficulty, Phase, Session, Settings};

    /// Everything the page needs between frames
    struct Game {
        session: Session,
        audio: AudioManager,
        settings: Settings,
        maze: MazeLayout,
        shooter_input: ShooterInput,
        last_time: f64,
        last_phase: Phase,
        submitted: bool,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.apply_settings(&settings);
            Self {
                session: Session::new(seed),
                audio,
                settings,
                maze: MazeLayout::standard(),
                shooter_input: ShooterInput::default(),
                last_time: 0.0,
                last_phase: Phase::Menu,
                submitted: false,
            }
        }

        fn start(&mut self, difficulty: Difficulty) {
            self.settings.difficulty = difficulty;
            self.settings.save();
            self.submitted = false;
            self.shooter_input = ShooterInput::default();
            self.audio.resume();
            self.session.start(difficulty);
        }

        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                (time - self.last_time).max(0.0) as u64
            } else {
                0
            };
            self.last_time = time;

            self.session.set_shooter_input(self.shooter_input);
            self.session.advance(dt);
            self.audio.play_all(&self.session.drain_cues());
        }

        fn render(&mut self, document: &Document) {
            let snapshot = self.session.snapshot();

            set_text(document, "hud-level", &snapshot.current_level.to_string());
            set_text(
                document,
                "hud-time",
                &format!("{}/{}", snapshot.time_remaining, snapshot.max_time),
            );
            set_text(document, "hud-score", &snapshot.score.to_string());
            set_text(document, "hud-difficulty", snapshot.difficulty.as_str());

            show(document, "menu", snapshot.phase == Phase::Menu);
            show(document, "hud", snapshot.phase == Phase::Playing);
            show(document, "stage", snapshot.phase == Phase::Playing);
            if let Some(el) = document.get_element_by_id("jumpscare") {
                let class = match (snapshot.phase, self.settings.reduced_motion) {
                    (Phase::Jumpscare, false) => "flash",
                    (Phase::Jumpscare, true) => "still",
                    _ => "hidden",
                };
                let _ = el.set_attribute("class", class);
            }
            show(document, "retry", snapshot.phase == Phase::Retry);
            show(document, "victory", snapshot.phase == Phase::Victory);
            show(
                document,
                "score-form",
                matches!(snapshot.phase, Phase::Retry | Phase::Victory) && !self.submitted,
            );
            show(document, "pause-menu", self.session.is_paused());
            show(
                document,
                "puzzle",
                matches!(self.session.active(), ActiveLevel::Narrative { .. }),
            );

            if snapshot.phase != self.last_phase {
                if matches!(snapshot.phase, Phase::Retry | Phase::Victory) {
                    set_text(document, "final-score", &snapshot.score.to_string());
                    set_text(document, "score-status", "");
                }
                self.last_phase = snapshot.phase;
            }

            if let Some(stage) = document.get_element_by_id("stage") {
                let html = match self.session.active() {
                    ActiveLevel::Maze(_) => self.maze_html(),
                    ActiveLevel::Shooter(_) => self.shooter_html(),
                    ActiveLevel::Narrative { level } => {
                        format!("<p class=\"puzzle-title\">Puzzle {}</p>", level)
                    }
                    ActiveLevel::Idle => String::new(),
                };
                stage.set_inner_html(&html);
            }
        }

        fn maze_html(&self) -> String {
            let Some(view) = self.session.maze_view() else {
                return String::new();
            };
            let pursuer = if view.mode == GhostMode::Frightened { 'g' } else { 'G' };
            let mut grid = String::from("<pre class=\"maze\">");
            for y in 0..GRID_SIZE {
                for x in 0..GRID_SIZE {
                    let pos = Position::new(x, y);
                    let ch = if pos == view.player {
                        '@'
                    } else if view.pursuers.iter().any(|(_, p)| *p == pos) {
                        pursuer
                    } else if !self.maze.is_traversable(pos) {
                        '#'
                    } else if view.power_cells.contains(&pos) {
                        'o'
                    } else if view.dots.contains(&pos) {
                        '.'
                    } else {
                        ' '
                    };
                    grid.push(ch);
                }
                grid.push('\n');
            }
            let _ = write!(
                grid,
                "</pre><p>Dots {}/{}</p>",
                view.dots_collected, view.total_dots
            );
            grid
        }

        fn shooter_html(&self) -> String {
            let Some(view) = self.session.shooter_view() else {
                return String::new();
            };
            let mut html = String::from("<div class=\"field\">");
            let mut sprite = |class: &str, x: f32, y: f32, size: f32| {
                let _ = write!(
                    html,
                    "<div class=\"{}\" style=\"left:{}px;top:{}px;width:{}px;height:{}px\"></div>",
                    class, x, y, size, size
                );
            };

            sprite("player", view.player.x, view.player.y, PLAYER_SIZE);
            for enemy in &view.enemies {
                let class = format!("enemy {:?}", enemy.enemy_type).to_lowercase();
                sprite(&class, enemy.pos.x, enemy.pos.y, ENEMY_SIZE);
            }
            if let Some(boss) = &view.boss {
                sprite("boss", boss.pos.x, boss.pos.y, BOSS_SIZE);
            }
            for bullet in &view.bullets {
                let class = format!("bullet {:?}", bullet.kind).to_lowercase();
                sprite(&class, bullet.pos.x, bullet.pos.y, bullet.size);
            }

            let banner = match (view.stage, &view.boss) {
                (Stage::Wave(i), _) => format!("Wave {}", i + 1),
                (Stage::Boss, Some(boss)) => format!("Boss {}/{}", boss.health, boss.max_health),
                (Stage::Boss, None) => "Boss down".to_string(),
            };
            let _ = write!(html, "</div><p>{}</p>", banner);
            html
        }
    }

    fn show(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn on_click(document: &Document, id: &str, mut handler: impl FnMut() + 'static) {
        if let Some(btn) = document.get_element_by_id(id) {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| handler());
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Fetch and render the leaderboard; failures only show a message
    fn refresh_leaderboard(difficulty: Option<Difficulty>) {
        wasm_bindgen_futures::spawn_local(async move {
            let query = HighScoreQuery {
                difficulty,
                ..HighScoreQuery::default()
            };
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let Some(list) = document.get_element_by_id("leaderboard") else {
                return;
            };
            match client::fetch_top(&query).await {
                Ok(entries) => {
                    list.set_inner_html("");
                    for entry in entries {
                        if let Ok(item) = document.create_element("li") {
                            item.set_text_content(Some(&format!(
                                "{} {} ({}, level {})",
                                entry.player_name,
                                entry.score,
                                entry.difficulty.as_str(),
                                entry.level_reached
                            )));
                            let _ = list.append_child(&item);
                        }
                    }
                }
                Err(err) => {
                    log::warn!("Leaderboard unavailable: {}", err);
                    list.set_text_content(Some("Leaderboard unavailable"));
                }
            }
        });
    }

    fn submit_score(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let name = document
            .get_element_by_id("player-name")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
            .unwrap_or_default();

        let submission = {
            let mut g = game.borrow_mut();
            g.settings.remember_name(&name);
            g.settings.save();
            highscores::submission_for(g.session.run(), &name)
        };
        if let Err(err) = submission.validate() {
            set_text(&document, "score-status", &err.to_string());
            return;
        }

        set_text(&document, "score-status", "Saving...");
        wasm_bindgen_futures::spawn_local(async move {
            let difficulty = submission.difficulty;
            let status = match client::submit(&submission).await {
                Ok(entry) => {
                    game.borrow_mut().submitted = true;
                    log::info!("Score {} saved as #{}", entry.score, entry.id);
                    refresh_leaderboard(Some(difficulty));
                    "Score saved!".to_string()
                }
                Err(err) => {
                    log::warn!("Score submission failed: {}", err);
                    format!("Could not save score ({})", err)
                }
            };
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                set_text(&document, "score-status", &status);
            }
        });
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        for difficulty in Difficulty::ALL {
            let game = game.clone();
            on_click(document, &format!("start-{}", difficulty.as_str()), move || {
                game.borrow_mut().start(difficulty);
            });
        }
        {
            let game = game.clone();
            on_click(document, "retry-btn", move || game.borrow_mut().session.retry());
        }
        {
            let game = game.clone();
            on_click(document, "menu-btn", move || game.borrow_mut().session.reset());
        }
        {
            let game = game.clone();
            on_click(document, "victory-menu-btn", move || {
                game.borrow_mut().session.reset()
            });
        }
        {
            let game = game.clone();
            on_click(document, "complete-puzzle-btn", move || {
                game.borrow_mut().session.complete_narrative()
            });
        }
        {
            let game = game.clone();
            on_click(document, "resume-btn", move || {
                game.borrow_mut().session.set_paused(false)
            });
        }
        {
            let game = game.clone();
            on_click(document, "submit-score-btn", move || submit_score(game.clone()));
        }
    }

    fn direction_for(key: &str) -> Option<Direction> {
        match key {
            "ArrowUp" | "w" | "W" => Some(Direction::Up),
            "ArrowDown" | "s" | "S" => Some(Direction::Down),
            "ArrowLeft" | "a" | "A" => Some(Direction::Left),
            "ArrowRight" | "d" | "D" => Some(Direction::Right),
            _ => None,
        }
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                let key = event.key();
                if key == " " {
                    event.prevent_default();
                    g.shooter_input.fire = true;
                    return;
                }
                if key == "Escape" {
                    if !g.session.is_paused() && g.session.run().phase() != Phase::Playing {
                        return;
                    }
                    let paused = !g.session.is_paused();
                    g.session.set_paused(paused);
                    return;
                }
                if let Some(dir) = direction_for(&key) {
                    event.prevent_default();
                    g.session.steer(dir);
                    match dir {
                        Direction::Left => g.shooter_input.left = true,
                        Direction::Right => g.shooter_input.right = true,
                        Direction::Up | Direction::Down => {}
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    " " => g.shooter_input.fire = false,
                    key => match direction_for(key) {
                        Some(Direction::Left) => g.shooter_input.left = false,
                        Some(Direction::Right) => g.shooter_input.right = false,
                        _ => {}
                    },
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Tab hidden
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.session.run().phase() == Phase::Playing {
                        g.session.set_paused(true);
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                g.shooter_input = ShooterInput::default();
                if g.settings.mute_on_blur {
                    g.audio.set_muted(true);
                }
                if g.session.run().phase() == Phase::Playing {
                    g.session.set_paused(true);
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window
                .add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().audio.set_muted(false);
            });
            let _ = window
                .add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            let mut g = game.borrow_mut();
            g.update(time);
            g.render(&document);
        }
        request_animation_frame(game);
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Hawkins Escape starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document; nothing to run in");
            return;
        };
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));
        log::info!("Game initialized with seed: {}", seed);

        {
            let g = game.borrow();
            if let Some(input) = document
                .get_element_by_id("player-name")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            {
                input.set_value(&g.settings.player_name);
            }
        }

        setup_buttons(&document, game.clone());
        setup_input_handlers(game.clone());
        setup_auto_pause(game.clone());
        refresh_leaderboard(None);

        request_animation_frame(game);
        log::info!("Hawkins Escape running!");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Hawkins Escape (native) starting headless demo run");
    headless::run(std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(1983));
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// A scripted run with no display: puzzles are skipped, the arcade levels get
/// a wandering autopilot, and the result is filed on an in-memory leaderboard.
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use hawkins_escape::highscores::{self, HighScoreQuery, HighScoreStore, MemoryHighScores};
    use hawkins_escape::sim::{Direction, ShooterInput};
    use hawkins_escape::{ActiveLevel, Difficulty, Phase, Session};

    const FRAME_MS: u64 = 16;
    const STEER_EVERY_FRAMES: u64 = 40;
    /// Give up after this much simulated time
    const DEMO_LIMIT_MS: u64 = 10 * 60 * 1000;

    pub fn run(seed: u64) {
        let mut session = Session::new(seed);
        let mut pilot = Pcg32::seed_from_u64(seed ^ 0x5eed);
        session.start(Difficulty::Medium);

        let mut elapsed = 0;
        let mut frame: u64 = 0;
        let mut attempts_left = 3;
        while elapsed < DEMO_LIMIT_MS {
            match session.run().phase() {
                Phase::Victory | Phase::Menu => break,
                Phase::Retry if attempts_left == 0 => break,
                Phase::Retry => {
                    attempts_left -= 1;
                    session.retry();
                }
                Phase::Jumpscare | Phase::Playing => {}
            }

            if matches!(session.active(), ActiveLevel::Narrative { .. }) {
                session.complete_narrative();
            } else if matches!(session.active(), ActiveLevel::Maze(_)) {
                if frame % STEER_EVERY_FRAMES == 0 {
                    session.steer(Direction::ALL[pilot.random_range(0..4)]);
                }
            } else if matches!(session.active(), ActiveLevel::Shooter(_)) {
                let left = pilot.random_bool(0.5);
                session.set_shooter_input(ShooterInput {
                    left,
                    right: !left,
                    fire: true,
                });
            }

            session.advance(FRAME_MS);
            elapsed += FRAME_MS;
            frame += 1;
        }

        let snapshot = session.snapshot();
        log::info!(
            "Demo over after {}s: phase {:?}, level {}, score {}",
            elapsed / 1000,
            snapshot.phase,
            snapshot.current_level,
            snapshot.score
        );
        if let Ok(json) = serde_json::to_string_pretty(&snapshot) {
            println!("{}", json);
        }

        let mut board = MemoryHighScores::new();
        let submission = highscores::submission_for(session.run(), "Autopilot");
        let body = match serde_json::to_string(&submission) {
            Ok(body) => body,
            Err(err) => {
                log::warn!("Could not encode submission: {}", err);
                return;
            }
        };
        let created = highscores::handle_post(&mut board, &body, format!("demo-seed-{}", seed));
        log::info!("Leaderboard answered {}", created.status);
        if let Ok(top) = board.top_scores(&HighScoreQuery::default()) {
            for entry in top {
                println!("{:>3}. {} {}", entry.id, entry.player_name, entry.score);
            }
        }
    }
}
