use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::File,
    io::{self, Stdout},
    sync::{mpsc, Arc},
    time::Duration,
};

use vtimeline::config::Config;
use vtimeline::loaders::Controller;
use vtimeline::network::ApiClient;
use vtimeline::ui::{self, Focus, Restore};
use vtimeline::{Dashboard, DashboardError, Update};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_logging(&config);

    if let Err(e) = run(config).await {
        error!("{}", e);
        eprintln!("vtimeline: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.log_level)
        .parse_default_env()
        .format_target(false);

    // Never stderr: it would draw over the dashboard.
    match File::create(&config.log_file) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("cannot open log file {}: {}", config.log_file.display(), e);
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

async fn run(config: Config) -> Result<(), DashboardError> {
    let api = ApiClient::new(&config.base_url, config.request_timeout())?;
    info!("Polling {}", api.base_url());

    // 1. Channel first, then the polling loops feeding it
    let (tx, rx) = mpsc::channel::<Update>();
    let controller = Controller::new(Arc::new(api), tx, config.policies());
    let loops = controller.start();

    // 2. Terminal, restored in reverse order on every way out
    enable_raw_mode()?;
    let _raw_mode = Restore::new(|| {
        let _ = disable_raw_mode();
    });
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _screen = Restore::new(|| {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    });
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &controller, &rx);

    for handle in loops {
        handle.abort();
    }
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    controller: &Controller,
    rx: &mpsc::Receiver<Update>,
) -> Result<(), DashboardError> {
    let mut dashboard = Dashboard::new();
    let mut focus = Focus::default();

    terminal.clear()?;
    loop {
        while let Ok(update) = rx.try_recv() {
            dashboard.apply(update);
        }

        terminal.draw(|f| ui::draw(f, &dashboard, focus))?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Tab => focus = focus.next(),
            KeyCode::Up | KeyCode::Down => {
                let down = key.code == KeyCode::Down;
                match focus {
                    Focus::Ip => {
                        let select = &mut dashboard.ip_select;
                        let changed = if down { select.select_next() } else { select.select_prev() };
                        if changed {
                            dashboard.on_ip_changed();
                            controller.ip_changed(dashboard.view_state());
                        }
                    }
                    Focus::Protocol => {
                        let select = &mut dashboard.protocol_select;
                        let changed = if down { select.select_next() } else { select.select_prev() };
                        if changed {
                            controller.protocol_changed(dashboard.view_state());
                        }
                    }
                }
            }
            KeyCode::Char('v') => {
                dashboard.set_view_mode(dashboard.view_mode.toggled());
                controller.view_mode_changed(dashboard.view_state());
            }
            _ => {}
        }
    }
    Ok(())
}
