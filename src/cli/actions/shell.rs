//! Interactive terminal front end. Each line is either a navigation path
//! (`/`, `/auth`, `/profile`, `/topic/<id>`), a global command, or a command
//! of the current view.

use crate::achievements;
use crate::auth::{AuthController, AuthForm, AuthMode, SubmitError};
use crate::backend::{memory::MemoryBackend, rest::RestBackend, AuthService, User, UserStore};
use crate::catalog::{option_label, Catalog};
use crate::progress::{level_progress_percent, ProgressSync, SyncOutcome};
use crate::quiz::{ModuleRunner, Outcome, Phase, QuizError};
use crate::routes::Route;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;

const HELP: &str = "\
Navigation:
  /                     dashboard
  /auth                 sign in or create an account
  /profile              level, XP and achievements
  /topic/<id>           modules of a topic
Auth view:
  email <address>       set the email
  password <secret>     set the password
  username <name>       set the username (sign-up only)
  toggle                switch between sign-in and sign-up
  submit                send the form
Topic view:
  open <module>         open a module lesson
Module view:
  start                 start the quiz
  answer <n> <letter>   pick an option, e.g. `answer 1 B`
  submit                grade the quiz
  retry                 clear answers after a partial result
  back                  return to the topic
Anywhere:
  signout, help, quit";

#[derive(Debug)]
pub enum Backend {
    Offline,
    Remote { api_url: Url, api_key: SecretString },
}

#[derive(Debug)]
pub struct Args {
    pub backend: Backend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn services<B>(backend: Arc<B>) -> (Arc<dyn AuthService>, Arc<dyn UserStore>)
where
    B: AuthService + UserStore + 'static,
{
    (backend.clone(), backend)
}

/// Runs the shell on stdin/stdout until `quit` or end of input.
///
/// # Errors
/// Returns an error if the catalog or HTTP client cannot be built, or if the
/// terminal cannot be read or written.
pub async fn execute(args: Args) -> Result<()> {
    let catalog = Arc::new(Catalog::embedded().context("failed to load catalog")?);

    let (auth, store) = match args.backend {
        Backend::Offline => {
            info!("using in-memory backend");
            services(Arc::new(MemoryBackend::new()))
        }
        Backend::Remote { api_url, api_key } => {
            info!(api_url = %api_url, "using remote backend");
            services(Arc::new(
                RestBackend::new(&api_url, api_key).context("failed to build API client")?,
            ))
        }
    };

    let controller = Arc::new(AuthController::new(auth, Arc::clone(&store)));
    let sync = ProgressSync::new(Arc::clone(&catalog), Arc::clone(&controller), store);

    let mut changes = controller.subscribe();
    let watcher = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            debug!(
                authenticated = state.is_authenticated(),
                loading = state.loading,
                "session changed"
            );
        }
    });

    if let Err(err) = controller.load_user().await {
        warn!(error = %err, "failed to load user");
    }

    let mut shell = Shell::new(&catalog, controller, sync, std::io::stdout());
    shell.render()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        shell.prompt()?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };
        if shell.handle(&line).await? == Flow::Quit {
            break;
        }
    }

    watcher.abort();
    Ok(())
}

pub struct Shell<'a, W: Write> {
    catalog: &'a Catalog,
    controller: Arc<AuthController>,
    sync: ProgressSync,
    out: W,
    route: Route,
    form: Option<AuthForm>,
    runner: Option<ModuleRunner<'a>>,
}

impl<'a, W: Write> Shell<'a, W> {
    pub fn new(
        catalog: &'a Catalog,
        controller: Arc<AuthController>,
        sync: ProgressSync,
        out: W,
    ) -> Self {
        Self {
            catalog,
            controller,
            sync,
            out,
            route: Route::Dashboard,
            form: None,
            runner: None,
        }
    }

    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// # Errors
    /// Returns an error if the output cannot be written.
    pub fn prompt(&mut self) -> Result<()> {
        write!(self.out, "cyberlearn:{}> ", self.route)?;
        self.out.flush()?;
        Ok(())
    }

    /// Handles one input line.
    ///
    /// # Errors
    /// Returns an error only if the output cannot be written; service and
    /// input errors are shown to the user.
    pub async fn handle(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => writeln!(self.out, "{HELP}")?,
            "signout" => {
                self.controller.sign_out().await;
                writeln!(self.out, "Signed out.")?;
                self.navigate(Route::Dashboard)?;
            }
            path if path.starts_with('/') => self.navigate(Route::parse(path))?,
            _ if self.runner.is_some() => self.module_command(command, rest).await?,
            _ => match self.route {
                Route::Auth => self.auth_command(command, rest).await?,
                Route::Topic(_) => self.topic_command(command, rest)?,
                _ => self.unknown(command)?,
            },
        }
        Ok(Flow::Continue)
    }

    /// Switches view. Leaving the auth view drops its form, which also stops
    /// any running cooldown.
    ///
    /// # Errors
    /// Returns an error if the output cannot be written.
    pub fn navigate(&mut self, route: Route) -> Result<()> {
        let route = if route.requires_user() && self.controller.current_user().is_none() {
            writeln!(self.out, "Sign in first.")?;
            Route::Auth
        } else {
            route
        };

        if route == Route::Auth {
            if self.route != Route::Auth || self.form.is_none() {
                self.form = Some(AuthForm::new(AuthMode::SignIn));
            }
        } else {
            self.form = None;
        }
        self.runner = None;
        self.route = route;
        self.render()
    }

    /// # Errors
    /// Returns an error if the output cannot be written.
    pub fn render(&mut self) -> Result<()> {
        let user = self.controller.current_user();
        match &user {
            Some(user) => writeln!(
                self.out,
                "== CyberLearn == {} | Level {} | {} XP",
                user.username,
                user.effective_level(),
                user.xp
            )?,
            None => writeln!(self.out, "== CyberLearn == not signed in (/auth)")?,
        }

        if self.runner.is_some() {
            return self.render_module();
        }
        match self.route.clone() {
            Route::Dashboard => self.render_dashboard(user.as_ref()),
            Route::Auth => self.render_auth(),
            Route::Profile => self.render_profile(user.as_ref()),
            Route::Topic(id) => self.render_topic(&id, user.as_ref()),
            Route::NotFound(path) => {
                writeln!(self.out, "Page not found: {path}")?;
                Ok(())
            }
        }
    }

    fn unknown(&mut self, command: &str) -> Result<()> {
        writeln!(self.out, "Unknown command `{command}`, type `help`.")?;
        Ok(())
    }

    fn render_dashboard(&mut self, user: Option<&User>) -> Result<()> {
        writeln!(self.out, "Master Cybersecurity Through Play")?;
        for topic in self.catalog.topics() {
            let percent = user.map_or(0, |user| topic.completion_percent(&user.completed_modules));
            writeln!(
                self.out,
                "  {:<20} {} {:>3}%  {} modules",
                topic.id,
                bar(percent, 10),
                percent,
                topic.modules.len()
            )?;
            writeln!(self.out, "      {}: {}", topic.title, topic.description)?;
        }
        Ok(())
    }

    fn render_topic(&mut self, topic_id: &str, user: Option<&User>) -> Result<()> {
        let Some(topic) = self.catalog.topic(topic_id) else {
            writeln!(self.out, "Topic not found")?;
            return Ok(());
        };
        writeln!(self.out, "{}\n{}", topic.title, topic.description)?;
        for module in &topic.modules {
            let done = user.is_some_and(|user| user.has_completed(&module.id));
            writeln!(
                self.out,
                "  [{}] {:<10} {} ({} XP)",
                if done { 'x' } else { ' ' },
                module.id,
                module.title,
                module.xp
            )?;
        }
        writeln!(self.out, "Type `open <module>` to start a lesson.")?;
        Ok(())
    }

    fn render_profile(&mut self, user: Option<&User>) -> Result<()> {
        let Some(user) = user else {
            return Ok(());
        };
        writeln!(self.out, "{} <{}>", user.username, user.email)?;
        writeln!(self.out, "Level {}", user.effective_level())?;
        let percent = level_progress_percent(user.xp);
        writeln!(self.out, "Experience {} {} XP", bar(percent, 20), user.xp)?;
        writeln!(self.out, "Achievements:")?;
        for status in achievements::evaluate(user, self.catalog) {
            writeln!(
                self.out,
                "  [{}] {}: {}",
                if status.unlocked { 'x' } else { ' ' },
                status.achievement.title,
                status.achievement.description
            )?;
        }
        Ok(())
    }

    fn render_auth(&mut self) -> Result<()> {
        let Some(form) = self.form.as_ref() else {
            return Ok(());
        };
        let heading = match form.mode() {
            AuthMode::SignIn => "Sign in",
            AuthMode::SignUp => "Create account",
        };
        writeln!(self.out, "{heading}")?;
        writeln!(self.out, "  email:    {}", form.email())?;
        writeln!(
            self.out,
            "  password: {}",
            if form.has_password() { "******" } else { "" }
        )?;
        if form.mode() == AuthMode::SignUp {
            writeln!(self.out, "  username: {}", form.username())?;
        }
        if let Some(error) = form.error() {
            writeln!(self.out, "  error: {error}")?;
        }
        let remaining = form.cooldown_remaining();
        if remaining > 0 {
            writeln!(self.out, "  Please wait {remaining}s")?;
        }
        Ok(())
    }

    fn render_module(&mut self) -> Result<()> {
        let Some(runner) = self.runner.as_ref() else {
            return Ok(());
        };
        let module = runner.module();
        match runner.phase() {
            Phase::Lesson => {
                writeln!(self.out, "{}\n{}\n", module.title, module.description)?;
                writeln!(self.out, "{}\n", module.content)?;
                writeln!(self.out, "Ready to test your knowledge? Type `start`.")?;
            }
            Phase::Quiz | Phase::Graded => {
                writeln!(self.out, "Module Quiz: {}", module.title)?;
                for (index, question) in module.quiz.iter().enumerate() {
                    writeln!(self.out, "{}. {}", index + 1, question.question)?;
                    for (option, text) in question.options.iter().enumerate() {
                        let marker = if runner.selected(index) == Some(option) {
                            '*'
                        } else {
                            ' '
                        };
                        writeln!(self.out, "  {marker}{}) {text}", option_label(option))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render_feedback(&mut self) -> Result<()> {
        let Some(runner) = self.runner.as_ref() else {
            return Ok(());
        };
        for (index, correct) in runner.results().iter().enumerate() {
            if *correct {
                writeln!(self.out, "{}. Correct answer!", index + 1)?;
            } else {
                let label = runner.correct_label(index).unwrap_or('?');
                writeln!(
                    self.out,
                    "{}. Incorrect. The correct answer is {label}.",
                    index + 1
                )?;
            }
        }
        Ok(())
    }

    async fn auth_command(&mut self, command: &str, rest: &str) -> Result<()> {
        let Some(form) = self.form.as_mut() else {
            return self.unknown(command);
        };
        match command {
            "email" => form.set_email(rest),
            "password" => form.set_password(SecretString::from(rest.to_string())),
            "username" => form.set_username(rest),
            "toggle" => form.toggle_mode(),
            "submit" => {
                let mode = form.mode();
                match form.submit(&self.controller).await {
                    Ok(()) if mode == AuthMode::SignIn => {
                        writeln!(self.out, "Signed in.")?;
                        return self.navigate(Route::Dashboard);
                    }
                    Ok(()) => writeln!(
                        self.out,
                        "Account created. Confirm your email if asked, then sign in."
                    )?,
                    Err(SubmitError::CoolingDown(seconds)) => {
                        writeln!(self.out, "Please wait {seconds}s")?;
                        return Ok(());
                    }
                    Err(_) => {}
                }
            }
            _ => return self.unknown(command),
        }
        self.render_auth()
    }

    fn topic_command(&mut self, command: &str, rest: &str) -> Result<()> {
        if command != "open" {
            return self.unknown(command);
        }
        let Route::Topic(topic_id) = &self.route else {
            return self.unknown(command);
        };
        let catalog = self.catalog;
        let module = catalog
            .topic(topic_id)
            .and_then(|topic| topic.module(rest));
        match module {
            Some(module) => {
                self.runner = Some(ModuleRunner::new(module));
                self.render_module()
            }
            None => {
                writeln!(self.out, "Module not found: {rest}")?;
                Ok(())
            }
        }
    }

    async fn module_command(&mut self, command: &str, rest: &str) -> Result<()> {
        let Some(runner) = self.runner.as_mut() else {
            return self.unknown(command);
        };
        let result = match command {
            "start" => runner.start_quiz(),
            "answer" => match parse_answer(rest) {
                Some((question, option)) => runner.select(question, option),
                None => {
                    writeln!(self.out, "Usage: answer <question number> <letter>")?;
                    return Ok(());
                }
            },
            "retry" => runner.reset(),
            "submit" => return self.submit_quiz().await,
            "back" => {
                self.runner = None;
                return self.render();
            }
            _ => return self.unknown(command),
        };

        match result {
            Ok(()) => self.render_module(),
            Err(err) => {
                writeln!(self.out, "{}", quiz_message(&err))?;
                Ok(())
            }
        }
    }

    async fn submit_quiz(&mut self) -> Result<()> {
        let Some(runner) = self.runner.as_mut() else {
            return Ok(());
        };
        let outcome = match runner.submit() {
            Ok(outcome) => outcome,
            Err(err) => {
                writeln!(self.out, "{}", quiz_message(&err))?;
                return Ok(());
            }
        };

        self.render_feedback()?;
        match outcome {
            Outcome::AllCorrect(completion) => {
                writeln!(
                    self.out,
                    "All answers correct! Module complete (+{} XP).",
                    completion.xp
                )?;
                // Sync failures are logged by the synchronizer and not shown.
                match self.sync.complete_module(&completion.module_id).await {
                    Ok(SyncOutcome::SignedOut) => {
                        writeln!(self.out, "Sign in to save your progress.")?;
                    }
                    Ok(SyncOutcome::AlreadyCompleted) => {
                        writeln!(self.out, "Already completed before; no XP awarded.")?;
                    }
                    Ok(SyncOutcome::Synced { .. } | SyncOutcome::UnknownModule) | Err(_) => {}
                }
            }
            Outcome::Partial { correct, total } => {
                writeln!(
                    self.out,
                    "{correct}/{total} correct. Type `retry` to try again."
                )?;
            }
        }
        Ok(())
    }
}

/// Parses `"<question number> <letter>"` into zero-based indices.
fn parse_answer(input: &str) -> Option<(usize, usize)> {
    let mut parts = input.split_whitespace();
    let question = parts.next()?.parse::<usize>().ok()?.checked_sub(1)?;
    let letter = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let mut chars = letter.chars();
    let label = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !label.is_ascii_uppercase() {
        return None;
    }
    Some((question, usize::from(label as u8 - b'A')))
}

fn quiz_message(err: &QuizError) -> String {
    match err {
        QuizError::Unanswered(missing) => {
            let numbers: Vec<String> = missing.iter().map(|index| (index + 1).to_string()).collect();
            format!("Answer every question first (missing: {})", numbers.join(", "))
        }
        QuizError::WrongPhase(Phase::Lesson) => "Type `start` to begin the quiz.".to_string(),
        QuizError::WrongPhase(Phase::Graded) => {
            "The quiz has been submitted. Type `retry` or `back`.".to_string()
        }
        other => other.to_string(),
    }
}

fn bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
