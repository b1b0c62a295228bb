//! Live view for the usbwatch binary: redraws the device menu whenever the [`Coordinator`] reports a change.
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute, terminal,
};
use std::io::{stdout, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use usbwatch::config::Config;
use usbwatch::display::{self, PrintSettings};
use usbwatch::error::{Error, ErrorKind, Result};
use usbwatch::parser::Enumerator;
use usbwatch::watch::{self, Coordinator, UiEvent};

fn crossterm_error(e: std::io::Error) -> Error {
    Error::new(ErrorKind::Other("crossterm"), &e.to_string())
}

pub fn watch_usb_devices(config: &Config, mut print_settings: PrintSettings) -> Result<()> {
    print_settings.raw_mode = true;
    let enumerator = config.enumerator();
    let interval = config.interval()?;

    let mut stdout = stdout();
    execute!(
        stdout,
        cursor::Hide,
        terminal::Clear(terminal::ClearType::All)
    )
    .map_err(crossterm_error)?;

    terminal::enable_raw_mode()?;

    // first draw, before any change is seen
    refresh(&enumerator, config.mask_serials, &print_settings)?;

    let (tx, rx) = mpsc::channel::<UiEvent>();
    let mut coordinator = Coordinator::new(config.prober(), tx.clone()).with_interval(interval);
    coordinator.start()?;

    spawn_key_listener(tx);

    // this thread is the UI thread: every redraw happens here
    watch::dispatch(&rx, || {
        if let Err(e) = refresh(&enumerator, config.mask_serials, &print_settings) {
            log::error!("Failed to draw devices: {}", e);
        }
    });

    coordinator.join()?;

    execute!(stdout, cursor::Show).map_err(crossterm_error)?;
    terminal::disable_raw_mode()?;

    Ok(())
}

fn spawn_key_listener(tx: Sender<UiEvent>) {
    thread::spawn(move || loop {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => (),
            Ok(false) => continue,
            Err(e) => {
                log::error!("Failed to poll terminal events: {}", e);
                let _ = tx.send(UiEvent::Quit);
                break;
            }
        }

        if let Ok(Event::Key(KeyEvent {
            code, modifiers, ..
        })) = event::read()
        {
            let ui_event = match (code, modifiers) {
                (KeyCode::Char('q'), _)
                | (KeyCode::Esc, _)
                | (KeyCode::Char('c'), KeyModifiers::CONTROL) => UiEvent::Quit,
                (KeyCode::Char('r'), _) => UiEvent::Refresh,
                _ => continue,
            };
            if tx.send(ui_event).is_err() || ui_event == UiEvent::Quit {
                break;
            }
        }
    });
}

fn refresh(enumerator: &Enumerator, mask_serials: bool, print_settings: &PrintSettings) -> Result<()> {
    let mut records = enumerator.parse_all();
    if mask_serials {
        display::mask_serials(&mut records);
    }
    let items = display::menu_items(&records);

    let mut stdout = stdout();
    execute!(
        stdout,
        cursor::MoveTo(0, 0),
        terminal::Clear(terminal::ClearType::All),
    )
    .map_err(crossterm_error)?;

    write!(
        stdout,
        "USB devices at {} ('q' quit, 'r' refresh)\r\n\r\n",
        chrono::Local::now().format("%H:%M:%S")
    )?;
    display::print_menu(&mut stdout, &items, print_settings)?;
    stdout.flush()?;

    Ok(())
}
