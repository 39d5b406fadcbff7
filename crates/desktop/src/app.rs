use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use iced::widget::{column, container, image, text};
use iced::{event, keyboard, window, Element, Event, Length, Subscription, Task};

use sightline_core::shared::frame::Frame;
use sightline_core::source::domain::frame_slot::FrameSlot;

use crate::workers::detection_worker::{Control, WorkerMessage, WorkerSession};

/// How often the worker channel and the display slot are polled.
const POLL_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    Quit,
}

pub struct App {
    session: WorkerSession,
    picture: Option<image::Handle>,
    display: Option<Arc<FrameSlot>>,
    shown_generation: u64,
    /// Set while a demo still image waits for the key press that starts
    /// the camera.
    advance_on_quit: bool,
    status: String,
}

impl App {
    pub fn new(session: WorkerSession) -> (Self, Task<Message>) {
        (
            Self {
                session,
                picture: None,
                display: None,
                shown_generation: 0,
                advance_on_quit: false,
                status: "Starting...".to_string(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                self.drain_worker();
                self.refresh_live_picture();
            }
            Message::Quit if self.advance_on_quit => {
                self.advance_on_quit = false;
                self.picture = None;
                if self.session.control.send(Control::Advance).is_ok() {
                    self.status = "Starting camera...".to_string();
                } else {
                    log::warn!("Detection worker exited before the camera could start");
                    self.status = "Detection worker stopped, press q to quit".to_string();
                }
            }
            Message::Quit => {
                self.session.cancelled.store(true, Ordering::Release);
                return iced::exit();
            }
        }
        Task::none()
    }

    fn drain_worker(&mut self) {
        while let Ok(message) = self.session.messages.try_recv() {
            match message {
                WorkerMessage::Status(status) => self.status = status,
                WorkerMessage::DownloadProgress(name, downloaded, total) => {
                    self.status = if total > 0 {
                        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
                        format!("Downloading {name}... {pct}%")
                    } else {
                        format!("Downloading {name}... {downloaded} bytes")
                    };
                }
                WorkerMessage::Still { frame, advance } => {
                    self.picture = Some(to_handle(&frame));
                    self.display = None;
                    self.advance_on_quit = advance;
                    if advance {
                        self.status.push_str("  (press q to start the camera)");
                    }
                }
                WorkerMessage::Live(display) => {
                    self.display = Some(display);
                    self.shown_generation = 0;
                }
                WorkerMessage::Finished(status) => self.status = status,
                WorkerMessage::Error(error) => self.status = format!("Error: {error}"),
            }
        }
    }

    fn refresh_live_picture(&mut self) {
        let Some(display) = &self.display else {
            return;
        };
        let (frame, generation) = display.snapshot();
        if generation == self.shown_generation {
            return;
        }
        self.shown_generation = generation;
        if let Some(frame) = frame {
            self.picture = Some(to_handle(&frame));
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let picture: Element<'_, Message> = match &self.picture {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("Waiting for frames...")).center(Length::Fill).into(),
        };
        let status = container(text(&self.status).size(13)).padding([4, 8]);

        column![picture, status].height(Length::Fill).into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(POLL_INTERVAL).map(|_| Message::Tick),
            event::listen_with(on_event),
        ])
    }
}

fn on_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Keyboard(keyboard::Event::KeyPressed {
            key: keyboard::Key::Character(c),
            ..
        }) if c.as_str().eq_ignore_ascii_case("q") => Some(Message::Quit),
        _ => None,
    }
}

fn to_handle(frame: &Frame) -> image::Handle {
    image::Handle::from_rgba(frame.width(), frame.height(), rgba_pixels(frame))
}

fn rgba_pixels(frame: &Frame) -> Vec<u8> {
    frame
        .data()
        .chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
        .collect()
}
