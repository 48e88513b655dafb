//! Shared test helpers for swipeseek-core integration tests.
//!
//! [`FakeDevice`] simulates a screen of virtualized wheels: only the items
//! inside a wheel's window appear in tree dumps, and swipes move the window
//! by one item per [`ITEM_EXTENT`] points of finger travel. [`mock_agent`]
//! is a scripted TCP agent for driver tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use swipeseek_core::driver::{AutomationDriver, DriverError};
use swipeseek_core::element::{ElementFrame, UIElement};
use swipeseek_core::gesture::Orientation;
use swipeseek_core::protocol::{decode_request, encode_response, read_frame_length, Request, Response};

/// Size of one item along the scroll axis, in points.
pub const ITEM_EXTENT: f64 = 50.0;

/// Cross-axis size of a wheel.
const WHEEL_THICKNESS: f64 = 100.0;

/// Gap between wheels laid out side by side.
const WHEEL_GAP: f64 = 20.0;

// ---------------------------------------------------------------------------
// Simulated device
// ---------------------------------------------------------------------------

/// Something the fake device was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Dump,
    Swipe { wheel: Option<String>, steps: i64 },
    Tap { wheel: Option<String>, text: Option<String> },
    TapElement(String),
    TapLabel(String),
}

/// One virtualized wheel.
#[derive(Debug, Clone)]
pub struct Wheel {
    id: String,
    labels: Vec<String>,
    visible: usize,
    orientation: Orientation,
    origin: (f64, f64),
    offset: usize,
    hidden: Option<(String, u32)>,
}

impl Wheel {
    pub fn new(id: &str, labels: Vec<String>, visible: usize) -> Self {
        Self {
            id: id.to_string(),
            labels,
            visible,
            orientation: Orientation::Vertical,
            origin: (0.0, 100.0),
            offset: 0,
            hidden: None,
        }
    }

    /// A wheel labelled with the numbers in `range`.
    pub fn numeric(id: &str, range: Range<i64>, visible: usize) -> Self {
        Self::new(id, range.map(|n| n.to_string()).collect(), visible)
    }

    /// Lays items out left to right.
    pub fn horizontal(mut self) -> Self {
        self.orientation = Orientation::Horizontal;
        self
    }

    /// Starts scrolled so that `offset` is the first visible item.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset.min(self.max_offset());
        self
    }

    /// Leaves `text` out of the next `dumps` tree dumps even when on screen.
    pub fn hide_for(mut self, text: &str, dumps: u32) -> Self {
        self.hidden = Some((text.to_string(), dumps));
        self
    }

    fn max_offset(&self) -> usize {
        self.labels.len().saturating_sub(self.visible)
    }

    fn frame(&self) -> ElementFrame {
        let extent = self.visible.max(1) as f64 * ITEM_EXTENT;
        let (x, y) = self.origin;
        match self.orientation {
            Orientation::Vertical => ElementFrame {
                x,
                y,
                width: WHEEL_THICKNESS,
                height: extent,
            },
            Orientation::Horizontal => ElementFrame {
                x,
                y,
                width: extent,
                height: ITEM_EXTENT,
            },
        }
    }

    fn item_frame(&self, slot: usize) -> ElementFrame {
        let frame = self.frame();
        let along = slot as f64 * ITEM_EXTENT;
        match self.orientation {
            Orientation::Vertical => ElementFrame {
                y: frame.y + along,
                height: ITEM_EXTENT,
                ..frame
            },
            Orientation::Horizontal => ElementFrame {
                x: frame.x + along,
                width: ITEM_EXTENT,
                ..frame
            },
        }
    }

    fn window(&self) -> Range<usize> {
        self.offset..(self.offset + self.visible).min(self.labels.len())
    }

    fn element(&mut self) -> UIElement {
        let mut children = Vec::new();
        for (slot, index) in self.window().enumerate() {
            let label = &self.labels[index];
            if let Some((hidden, remaining)) = &mut self.hidden {
                if hidden.as_str() == label.as_str() && *remaining > 0 {
                    *remaining -= 1;
                    continue;
                }
            }
            children.push(UIElement {
                label: Some(label.clone()),
                element_type: Some("StaticText".into()),
                frame: Some(self.item_frame(slot)),
                ..Default::default()
            });
        }
        UIElement {
            identifier: Some(self.id.clone()),
            element_type: Some("PickerWheel".into()),
            frame: Some(self.frame()),
            children,
            ..Default::default()
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        let f = self.frame();
        x >= f.x && x <= f.x + f.width && y >= f.y && y <= f.y + f.height
    }

    fn item_at(&self, x: f64, y: f64) -> Option<String> {
        let f = self.frame();
        let along = match self.orientation {
            Orientation::Vertical => y - f.y,
            Orientation::Horizontal => x - f.x,
        };
        let slot = (along / ITEM_EXTENT).floor() as usize;
        self.window().nth(slot).map(|i| self.labels[i].clone())
    }

    fn scroll(&mut self, (sx, sy): (f64, f64), (ex, ey): (f64, f64)) -> i64 {
        let travel = match self.orientation {
            Orientation::Vertical => sy - ey,
            Orientation::Horizontal => sx - ex,
        };
        let steps = (travel / ITEM_EXTENT).round() as i64;
        let max = self.max_offset() as i64;
        self.offset = (self.offset as i64 + steps).clamp(0, max) as usize;
        steps
    }
}

/// An [`AutomationDriver`] over simulated wheels.
pub struct FakeDevice {
    wheels: Mutex<Vec<Wheel>>,
    events: Mutex<Vec<Event>>,
    reject_swipes: Mutex<u32>,
    connected: AtomicBool,
}

impl FakeDevice {
    /// A device showing `wheels` side by side.
    pub fn new(wheels: Vec<Wheel>) -> Arc<Self> {
        let mut x = 0.0;
        let wheels = wheels
            .into_iter()
            .map(|mut w| {
                w.origin = (x, 100.0);
                x += w.frame().width + WHEEL_GAP;
                w
            })
            .collect();
        Arc::new(Self {
            wheels: Mutex::new(wheels),
            events: Mutex::new(Vec::new()),
            reject_swipes: Mutex::new(0),
            connected: AtomicBool::new(true),
        })
    }

    /// A device with one wheel.
    pub fn single(wheel: Wheel) -> Arc<Self> {
        Self::new(vec![wheel])
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn swipe_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Swipe { .. }))
            .count()
    }

    pub fn tap_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Tap { .. } | Event::TapElement(_) | Event::TapLabel(_)))
            .count()
    }

    /// Text of the last item tapped on `wheel`.
    pub fn selected(&self, wheel: &str) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Tap {
                wheel: Some(w),
                text,
            } if w == wheel => text,
            _ => None,
        })
    }

    /// First visible index of `wheel`.
    pub fn offset(&self, wheel: &str) -> usize {
        self.wheels
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == wheel)
            .map_or(0, |w| w.offset)
    }

    /// Refuses the next `n` swipes with a command failure.
    pub fn reject_next_swipes(&self, n: u32) {
        *self.reject_swipes.lock().unwrap() = n;
    }

    /// Every later command fails with a lost connection.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn check_connected(&self) -> Result<(), DriverError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DriverError::ConnectionLost("device went away".into()))
        }
    }
}

#[async_trait]
impl AutomationDriver for FakeDevice {
    async fn connect(&mut self) -> Result<(), DriverError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.check_connected()?;
        let (x, y) = (f64::from(x), f64::from(y));
        let wheels = self.wheels.lock().unwrap();
        let hit = wheels.iter().find(|w| w.contains(x, y));
        let event = Event::Tap {
            wheel: hit.map(|w| w.id.clone()),
            text: hit.and_then(|w| w.item_at(x, y)),
        };
        drop(wheels);
        self.record(event);
        Ok(())
    }

    async fn tap_element(&self, identifier: &str) -> Result<(), DriverError> {
        self.check_connected()?;
        self.record(Event::TapElement(identifier.to_string()));
        Ok(())
    }

    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError> {
        self.check_connected()?;
        self.record(Event::TapLabel(label.to_string()));
        Ok(())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        _duration: Option<f64>,
    ) -> Result<(), DriverError> {
        self.check_connected()?;
        {
            let mut reject = self.reject_swipes.lock().unwrap();
            if *reject > 0 {
                *reject -= 1;
                self.record(Event::Swipe {
                    wheel: None,
                    steps: 0,
                });
                return Err(DriverError::CommandFailed("container obscured".into()));
            }
        }

        let start = (f64::from(start_x), f64::from(start_y));
        let end = (f64::from(end_x), f64::from(end_y));
        let mut wheels = self.wheels.lock().unwrap();
        let (wheel, steps) = match wheels.iter_mut().find(|w| w.contains(start.0, start.1)) {
            Some(w) => (Some(w.id.clone()), w.scroll(start, end)),
            None => (None, 0),
        };
        drop(wheels);
        self.record(Event::Swipe { wheel, steps });
        Ok(())
    }

    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        self.check_connected()?;
        self.record(Event::Dump);
        let mut wheels = self.wheels.lock().unwrap();
        let children = wheels.iter_mut().map(Wheel::element).collect();
        Ok(vec![UIElement {
            identifier: Some("window".into()),
            element_type: Some("Window".into()),
            frame: Some(ElementFrame {
                x: 0.0,
                y: 0.0,
                width: 2000.0,
                height: 2000.0,
            }),
            children,
            ..Default::default()
        }])
    }
}

// ---------------------------------------------------------------------------
// Static screen
// ---------------------------------------------------------------------------

/// A screen that never scrolls: every dump returns the same tree and taps
/// are recorded as raw coordinates.
pub struct StaticScreen {
    tree: Vec<UIElement>,
    taps: Mutex<Vec<(i32, i32)>>,
}

impl StaticScreen {
    pub fn new(tree: Vec<UIElement>) -> Arc<Self> {
        Arc::new(Self {
            tree,
            taps: Mutex::new(Vec::new()),
        })
    }

    pub fn taps(&self) -> Vec<(i32, i32)> {
        self.taps.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutomationDriver for StaticScreen {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.taps.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn tap_element(&self, _identifier: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn tap_by_label(&self, _label: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn swipe(
        &self,
        _start_x: i32,
        _start_y: i32,
        _end_x: i32,
        _end_y: i32,
        _duration: Option<f64>,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        Ok(self.tree.clone())
    }
}

/// A labelled `StaticText` at the given frame.
pub fn text_at(label: &str, x: f64, y: f64, width: f64, height: f64) -> UIElement {
    UIElement {
        label: Some(label.to_string()),
        element_type: Some("StaticText".into()),
        frame: Some(ElementFrame {
            x,
            y,
            width,
            height,
        }),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Mock TCP agent
// ---------------------------------------------------------------------------

/// Starts a mock agent that accepts one connection and answers a sequence
/// of requests with canned responses. The first response is consumed by the
/// heartbeat that `AgentDriver::connect()` sends.
///
/// Decoded requests are returned through the join handle once every
/// response has been sent.
pub async fn mock_agent(
    responses: Vec<Response>,
) -> (SocketAddr, tokio::task::JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();

        for response in responses {
            let mut header = [0u8; 4];
            if stream.read_exact(&mut header).await.is_err() {
                break;
            }
            let len = read_frame_length(&header) as usize;
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).await.unwrap();
            received.push(decode_request(&payload).unwrap());

            stream.write_all(&encode_response(&response)).await.unwrap();
            stream.flush().await.unwrap();
        }
        received
    });

    (addr, handle)
}

/// JSON tree with one wheel holding `labels`, for canned `Tree` responses.
pub fn wheel_tree_json(id: &str, labels: &[&str]) -> String {
    let mut wheel = Wheel::new(id, labels.iter().map(|s| s.to_string()).collect(), labels.len());
    serde_json::to_string(&vec![wheel.element()]).unwrap()
}
