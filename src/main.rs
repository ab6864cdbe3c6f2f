use iced::widget::image::Handle;
use iced::widget::{button, canvas, column, container, image, row, scrollable, text, text_input, Column, Row};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::collections::{HashMap, HashSet};

use tribute_viewer::app_state::EditTarget;
use tribute_viewer::color::HexColor;
use tribute_viewer::config::ViewerConfig;
use tribute_viewer::gesture::{ContactEvent, GestureOutcome, Surface};
use tribute_viewer::raster::decode::{decode_image, load_file, DecodedImage};
use tribute_viewer::raster::import::{import_folder_async, ImportResult, PHOTO_EXTENSIONS};
use tribute_viewer::share::parse_share_link;
use tribute_viewer::state::data::{clamp_dedication, ImageRef, Realm};
use tribute_viewer::state::notes::NoteKind;
use tribute_viewer::viewport::Size;
use tribute_viewer::AppState;

mod ui;

use ui::canvas::ImageSlot;

/// Main application state
struct TributeViewer {
    state: AppState,
    /// GPU-ready handles for decoded images
    handles: HashMap<ImageRef, Handle>,
    /// Decodes in flight
    decoding: HashSet<ImageRef>,
    /// Raw text of the color field, which may not parse yet
    color_input: String,
    /// Motto or fullscreen note being edited
    note_edit: Option<(NoteKind, String)>,
    /// Last link built by Forward or Share
    link: Option<String>,
    /// Status line
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    SelectRealm(Realm),
    SelectThumbnail(usize),
    /// User clicked "Add Photo"
    AddPhoto,
    PhotoLoaded(Result<ImageRef, String>),
    /// User clicked "Import Folder"
    ImportFolder,
    /// Background import completed with results
    ImportComplete(ImportResult),
    RemoveCurrent,
    Decoded(ImageRef, Result<DecodedImage, String>),

    OpenFullscreen,
    CloseFullscreen,
    ToggleLock,
    CarouselTick,
    Forward,
    Share,
    CopyLink,

    BeginEdit(EditTarget),
    DedicationChanged(String),
    LifespanChanged(String),
    ColorChanged(String),
    ColorAuto,
    SaveEdit,
    CancelEdit,

    BeginNoteEdit(NoteKind),
    NoteChanged(String),
    SaveNote,
    CancelNote,

    Contact(Surface, Size, ContactEvent),
    SurfaceResized(Surface, Size),
    DismissNotice,
}

impl TributeViewer {
    /// Create the app, either normal or read-only from a share link
    fn new(config: ViewerConfig, link: Option<String>) -> (Self, Task<Message>) {
        let state = match link.as_deref().map(parse_share_link) {
            Some(Ok(Some(shared))) => {
                log::info!("🔗 Opening shared view");
                AppState::shared(config, shared)
            }
            Some(Ok(None)) => {
                log::warn!("⚠️  Argument is not a share link, starting normally");
                AppState::open(config)
            }
            Some(Err(e)) => {
                log::error!("❌ {}", e);
                let mut state = AppState::open(config);
                state.set_notice("This share link is damaged and cannot be shown");
                state
            }
            None => AppState::open(config),
        };

        let total: usize = Realm::ALL.iter().map(|&r| state.store().len(r)).sum();
        log::info!("🕯️  Tribute viewer initialized with {} images", total);

        let mut app = TributeViewer {
            state,
            handles: HashMap::new(),
            decoding: HashSet::new(),
            color_input: String::new(),
            note_edit: None,
            link: None,
            status: format!("Ready. {} images saved.", total),
        };
        let task = app.decode_pending();
        (app, task)
    }

    /// Drop image handles whose pixels the state no longer keeps
    fn prune_handles(&mut self) {
        let state = &self.state;
        self.handles.retain(|image, _| state.decoded(image).is_some());
    }

    /// Start background decodes for every image without pixels yet
    fn decode_pending(&mut self) -> Task<Message> {
        let pending: Vec<ImageRef> = self
            .state
            .undecoded_images()
            .into_iter()
            .filter(|image| self.decoding.insert(image.clone()))
            .collect();

        Task::batch(pending.into_iter().map(|image| {
            let key = image.clone();
            Task::perform(decode_image(image), move |result| {
                Message::Decoded(key.clone(), result.map_err(|e| e.to_string()))
            })
        }))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SelectRealm(realm) => {
                self.state.select_realm(realm);
                Task::none()
            }
            Message::SelectThumbnail(index) => {
                self.state.select_thumbnail(index);
                Task::none()
            }
            Message::AddPhoto => {
                let file = FileDialog::new()
                    .set_title("Choose a photo")
                    .add_filter("Images", &PHOTO_EXTENSIONS)
                    .pick_file();

                match file {
                    Some(path) => {
                        self.status = format!("Loading {}...", path.display());
                        Task::perform(load_file(path), |result| {
                            Message::PhotoLoaded(result.map_err(|e| e.to_string()))
                        })
                    }
                    None => Task::none(),
                }
            }
            Message::PhotoLoaded(Ok(image)) => {
                if let Ok(index) = self.state.add_image(image) {
                    self.status = format!("✅ Photo added at position {}", index + 1);
                }
                self.prune_handles();
                self.decode_pending()
            }
            Message::PhotoLoaded(Err(e)) => {
                log::error!("❌ Could not load photo: {}", e);
                self.status = format!("Could not load photo: {}", e);
                Task::none()
            }
            Message::ImportFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());
                    let limit = self.state.remaining_capacity();
                    return Task::perform(import_folder_async(folder_path, limit), Message::ImportComplete);
                }

                Task::none()
            }
            Message::ImportComplete(result) => {
                let found = result.images.len();
                let added = self.state.add_images(result.images);
                self.status = format!(
                    "✅ Import complete! Added {} of {} photos, skipped {} unreadable files.",
                    added, found, result.skipped_count
                );
                self.prune_handles();
                self.decode_pending()
            }
            Message::RemoveCurrent => {
                self.state.remove_current();
                self.prune_handles();
                Task::none()
            }
            Message::Decoded(key, result) => {
                self.decoding.remove(&key);
                match result {
                    Ok(decoded) => {
                        let (width, height) = decoded.pixels.dimensions();
                        let handle = Handle::from_rgba(width, height, decoded.pixels.as_raw().clone());
                        if self.state.insert_decoded(decoded) {
                            self.handles.insert(key, handle);
                        }
                    }
                    Err(e) => log::warn!("⚠️  Skipping undecodable image: {}", e),
                }
                Task::none()
            }

            Message::OpenFullscreen => {
                if self.state.open_fullscreen() {
                    self.link = None;
                }
                Task::none()
            }
            Message::CloseFullscreen => {
                self.state.close_fullscreen();
                self.link = None;
                Task::none()
            }
            Message::ToggleLock => {
                if let Some(locked) = self.state.toggle_lock() {
                    self.status = if locked { "Carousel locked" } else { "Carousel unlocked" }.to_string();
                }
                Task::none()
            }
            Message::CarouselTick => {
                if self.state.carousel_tick().is_some() && self.state.editor().is_some() {
                    // The editor belongs to the image that just left
                    self.state.cancel_edit();
                }
                Task::none()
            }
            Message::Forward => {
                match self.state.forward_shot_link() {
                    Ok(link) => self.link = Some(link),
                    Err(e) => {
                        log::error!("❌ Forward failed: {}", e);
                        self.status = format!("Could not build the link: {}", e);
                    }
                }
                Task::none()
            }
            Message::Share => {
                match self.state.share_payload_link() {
                    Ok(link) => self.link = Some(link),
                    Err(e) => self.status = format!("Could not build the link: {}", e),
                }
                Task::none()
            }
            Message::CopyLink => match &self.link {
                Some(link) => {
                    self.status = "Link copied".to_string();
                    iced::clipboard::write(link.clone())
                }
                None => Task::none(),
            },

            Message::BeginEdit(target) => {
                if self.state.begin_edit(target) {
                    self.color_input.clear();
                }
                Task::none()
            }
            Message::DedicationChanged(value) => {
                if let Some(edit) = self.state.editor_mut() {
                    edit.dedication = clamp_dedication(&value);
                }
                Task::none()
            }
            Message::LifespanChanged(value) => {
                if let Some(edit) = self.state.editor_mut() {
                    edit.lifespan = value;
                }
                Task::none()
            }
            Message::ColorChanged(value) => {
                if let (Some(color), Some(edit)) = (HexColor::parse(&value), self.state.editor_mut()) {
                    edit.pick_color(Some(color));
                }
                self.color_input = value;
                Task::none()
            }
            Message::ColorAuto => {
                if let Some(edit) = self.state.editor_mut() {
                    edit.pick_color(None);
                }
                self.color_input.clear();
                Task::none()
            }
            Message::SaveEdit => {
                if self.state.commit_edit() {
                    self.status = "✅ Dedication saved".to_string();
                }
                Task::none()
            }
            Message::CancelEdit => {
                self.state.cancel_edit();
                Task::none()
            }

            Message::BeginNoteEdit(kind) => {
                if !self.state.is_read_only() {
                    self.note_edit = Some((kind, self.state.note_text(kind)));
                }
                Task::none()
            }
            Message::NoteChanged(value) => {
                if let Some((_, text)) = &mut self.note_edit {
                    *text = value;
                }
                Task::none()
            }
            Message::SaveNote => {
                if let Some((kind, text)) = self.note_edit.take() {
                    self.state.save_note(kind, &text);
                }
                Task::none()
            }
            Message::CancelNote => {
                self.note_edit = None;
                Task::none()
            }

            Message::Contact(surface, size, event) => {
                self.state.surface_resized(surface, size);
                if let GestureOutcome::Committed { .. } = self.state.gesture_event(surface, event) {
                    log::debug!("Gesture committed on {:?}", surface);
                }
                Task::none()
            }
            Message::SurfaceResized(surface, size) => {
                self.state.surface_resized(surface, size);
                Task::none()
            }
            Message::DismissNotice => {
                self.state.clear_notice();
                Task::none()
            }
        }
    }

    /// Carousel timer, only while it can advance
    fn subscription(&self) -> Subscription<Message> {
        if self.state.carousel_running() {
            iced::time::every(self.state.config.carousel_interval()).map(|_| Message::CarouselTick)
        } else {
            Subscription::none()
        }
    }

    fn slot(&self, surface: Surface) -> Element<Message> {
        let overlay = self.state.overlay(surface);
        let target = self.state.target_for(surface);
        let handle = overlay.as_ref().and_then(|o| self.handles.get(&o.image));
        let natural = overlay
            .as_ref()
            .and_then(|o| self.state.decoded(&o.image))
            .map(DecodedImage::natural_size);
        let saved = target
            .map(|t| self.state.store().view_transform(t.realm, t.index))
            .unwrap_or_default();
        let lock_glyph = match surface {
            Surface::Fullscreen if self.state.carousel_running() || self.state.session().is_locked() => {
                Some((self.state.session().is_locked(), self.state.glyph_color(surface)))
            }
            _ => None,
        };

        canvas(ImageSlot {
            surface,
            handle,
            natural,
            live: self.state.live_view(surface),
            saved,
            text_color: self.state.dedication_color(surface),
            overlay,
            note: Some((self.state.surface_note(surface), self.state.note_color(surface))),
            lock_glyph,
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn editor_panel(&self) -> Option<Element<Message>> {
        let (_, edit) = self.state.editor()?;
        let color_hint = match edit.color {
            Some(Some(color)) => color.to_string(),
            _ => "auto".to_string(),
        };

        Some(
            column![
                text_input("Dedication", &edit.dedication)
                    .on_input(Message::DedicationChanged)
                    .on_submit(Message::SaveEdit),
                text_input("Birth - Death", &edit.lifespan)
                    .on_input(Message::LifespanChanged)
                    .on_submit(Message::SaveEdit),
                row![
                    text_input(&color_hint, &self.color_input).on_input(Message::ColorChanged),
                    button("Auto").on_press(Message::ColorAuto),
                ]
                .spacing(8),
                row![
                    button("Save").on_press(Message::SaveEdit),
                    button("Cancel").on_press(Message::CancelEdit),
                ]
                .spacing(8),
            ]
            .spacing(8)
            .into(),
        )
    }

    fn note_panel(&self) -> Option<Element<Message>> {
        let (kind, value) = self.note_edit.as_ref()?;
        let placeholder = kind.default_text(&self.state.config);
        Some(
            row![
                text_input(placeholder, value)
                    .on_input(Message::NoteChanged)
                    .on_submit(Message::SaveNote),
                button("Save").on_press(Message::SaveNote),
                button("Cancel").on_press(Message::CancelNote),
            ]
            .spacing(8)
            .into(),
        )
    }

    fn link_panel(&self) -> Option<Element<Message>> {
        let link = self.link.as_ref()?;
        Some(
            row![
                text_input("", link).width(Length::Fill),
                button("Copy").on_press(Message::CopyLink),
            ]
            .spacing(8)
            .into(),
        )
    }

    fn notice_panel(&self) -> Option<Element<Message>> {
        let notice = self.state.notice()?;
        Some(
            row![text(notice).size(16), button("OK").on_press(Message::DismissNotice)]
                .spacing(12)
                .align_y(Alignment::Center)
                .into(),
        )
    }

    /// Clickable thumbnails of a realm's non-empty slots
    fn thumbnail_strip(&self, realm: Realm, current: usize) -> Element<Message> {
        let thumbnails = self
            .state
            .store()
            .images(realm)
            .iter()
            .enumerate()
            .filter(|(_, img)| !img.is_empty())
            .fold(row![].spacing(6), |row, (index, img)| {
                let face: Element<Message> = match self.handles.get(img) {
                    Some(handle) => image(handle.clone()).width(64).height(64).into(),
                    None => text("...").into(),
                };
                let thumb = button(face).padding(if index == current { 4 } else { 1 });
                row.push(thumb.on_press(Message::SelectThumbnail(index)))
            });

        scrollable(thumbnails)
            .direction(scrollable::Direction::Horizontal(scrollable::Scrollbar::default()))
            .into()
    }

    fn fullscreen_view(&self) -> Element<Message> {
        let read_only = self.state.is_read_only();
        let mut controls: Row<Message> = row![].spacing(10).align_y(Alignment::Center);

        if !read_only {
            let locked = self.state.session().is_locked();
            let seen = self.state.engagement().unwrap_or_default();
            controls = controls
                .push(button(if locked { "Unlock" } else { "Lock" }).on_press(Message::ToggleLock))
                .push(button("Edit").on_press(Message::BeginEdit(EditTarget::Fullscreen)))
                .push(button("Edit Note").on_press(Message::BeginNoteEdit(NoteKind::FullscreenNote)))
                .push(button(text(format!("Forward ({})", seen.forward))).on_press(Message::Forward))
                .push(button("Share").on_press(Message::Share))
                .push(text(format!("Seen {} times", seen.seen)).size(14))
                .push(button("Close").on_press(Message::CloseFullscreen));
        } else {
            controls = controls.push(button("Forward").on_press(Message::Forward));
        }

        let mut content: Column<Message> = column![self.slot(Surface::Fullscreen)]
            .spacing(10)
            .padding(10);
        if let (false, Some((realm, index))) = (read_only, self.state.session().position()) {
            content = content.push(self.thumbnail_strip(realm, index));
        }
        content = content
            .push(controls)
            .push_maybe(self.editor_panel())
            .push_maybe(self.note_panel())
            .push_maybe(self.link_panel())
            .push_maybe(self.notice_panel());
        content.into()
    }

    fn shot_view(&self, shot: &ImageRef) -> Element<Message> {
        let body: Element<Message> = match self.handles.get(shot) {
            Some(handle) => image(handle.clone()).width(Length::Fill).height(Length::Fill).into(),
            None => text("Loading...").size(24).into(),
        };
        container(body)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if let Some(shot) = self.state.shot() {
            return self.shot_view(shot);
        }
        if self.state.session().is_open() {
            return self.fullscreen_view();
        }

        let selected = self.state.selected_realm();
        let realms = Realm::ALL.iter().fold(row![].spacing(8), |row, &realm| {
            let label = text(realm.to_string());
            let realm_button = if realm == selected {
                button(label)
            } else {
                button(label).on_press(Message::SelectRealm(realm))
            };
            row.push(realm_button)
        });

        let has_image = self.state.target_for(Surface::MainSlot).is_some();
        let controls = row![
            button("Add Photo").on_press(Message::AddPhoto),
            button("Import Folder").on_press(Message::ImportFolder),
            button("Remove").on_press_maybe(has_image.then_some(Message::RemoveCurrent)),
            button("Edit Dedication").on_press_maybe(has_image.then_some(Message::BeginEdit(EditTarget::Main))),
            button("Fullscreen").on_press_maybe(has_image.then_some(Message::OpenFullscreen)),
        ]
        .spacing(10);

        let slot = container(self.slot(Surface::MainSlot)).width(Length::Fill).height(Length::FillPortion(4));

        let motto = row![
            text(self.state.note_text(NoteKind::Motto)).size(28),
            button("Edit").on_press(Message::BeginNoteEdit(NoteKind::Motto)),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        column![
            motto,
            realms,
            slot,
            self.thumbnail_strip(selected, self.state.store().current_index(selected)),
            controls,
        ]
        .push_maybe(self.editor_panel())
        .push_maybe(self.note_panel())
        .push_maybe(self.notice_panel())
        .push(text(&self.status).size(14))
        .spacing(12)
        .padding(20)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::load();
    // A share link may be passed as the only argument
    let link = std::env::args().nth(1);

    iced::application("Tribute Viewer", TributeViewer::update, TributeViewer::view)
        .subscription(TributeViewer::subscription)
        .theme(TributeViewer::theme)
        .centered()
        .run_with(move || TributeViewer::new(config, link))
}
