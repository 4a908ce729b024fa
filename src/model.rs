// src/model.rs
use serde::Deserialize;

pub const IP_PLACEHOLDER: &str = "-- choose an IP --";
pub const ALL_PROTOCOLS: &str = "-- all protocols --";
pub const PICK_IP_FIRST: &str = "-- choose an IP first --";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Summarized,
    Complete,
}

impl ViewMode {
    /// Value sent as the `view` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Summarized => "summarized",
            ViewMode::Complete => "complete",
        }
    }

    pub fn time_unit(self) -> TimeUnit {
        match self {
            ViewMode::Complete => TimeUnit::Second,
            ViewMode::Summarized => TimeUnit::Minute,
        }
    }

    pub fn chart_height_px(self) -> u16 {
        match self {
            ViewMode::Complete => 600,
            ViewMode::Summarized => 400,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Summarized => ViewMode::Complete,
            ViewMode::Complete => ViewMode::Summarized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Second,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Second => "second",
        }
    }
}

/// Selection snapshot handed to every loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub ip: Option<String>,
    pub protocol: Option<String>,
    pub view: ViewMode,
}

impl ViewState {
    pub fn new(ip: Option<&str>, protocol: Option<&str>, view: ViewMode) -> Self {
        let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_owned);
        Self {
            ip: non_empty(ip),
            protocol: non_empty(protocol),
            view,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// A drop-down: option 0 is always the empty-valued placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectBox {
    options: Vec<SelectOption>,
    selected: usize,
}

impl SelectBox {
    pub fn with_placeholder(text: &str) -> Self {
        Self {
            options: vec![SelectOption {
                value: String::new(),
                text: text.to_string(),
            }],
            selected: 0,
        }
    }

    /// Replaces every option. The selection falls back to the placeholder.
    pub fn replace(&mut self, placeholder: &str, values: &[String]) {
        *self = Self::with_placeholder(placeholder);
        self.options.extend(values.iter().map(|v| SelectOption {
            value: v.clone(),
            text: v.clone(),
        }));
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Selected value, `None` while the placeholder is selected.
    pub fn value(&self) -> Option<&str> {
        self.options
            .get(self.selected)
            .map(|o| o.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn select_next(&mut self) -> bool {
        if self.selected + 1 < self.options.len() {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    pub fn select_prev(&mut self) -> bool {
        if self.selected > 0 {
            self.selected -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressView {
    /// Nothing fetched yet.
    Pending,
    Idle,
    Running { value: f64, text: String },
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineChart {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    pub unit: TimeUnit,
    pub height_px: u16,
}

impl TimelineChart {
    fn new(view: ViewMode) -> Self {
        Self {
            labels: Vec::new(),
            data: Vec::new(),
            unit: view.time_unit(),
            height_px: view.chart_height_px(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub ip: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub count: u64,
}

/// Fetched data on its way to the draw loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Progress(f64),
    ProgressReset,
    Ips(Vec<String>),
    /// `protocols` is `None` when no IP is selected.
    Protocols {
        ip: Option<String>,
        protocols: Option<Vec<String>>,
    },
    /// `view` is the selection the series was fetched for.
    Timeline {
        view: ViewState,
        points: Option<Vec<ChartPoint>>,
    },
    Events {
        ip: String,
        rows: Vec<EventRecord>,
    },
}

pub fn progress_view(progress: f64) -> ProgressView {
    if progress >= 100.0 {
        ProgressView::Completed
    } else if progress > 0.0 {
        ProgressView::Running {
            value: progress,
            text: format!("{:.2}%", progress),
        }
    } else {
        ProgressView::Idle
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub progress: ProgressView,
    pub ip_select: SelectBox,
    pub protocol_select: SelectBox,
    pub view_mode: ViewMode,
    pub chart: TimelineChart,
    pub events: Vec<EventRecord>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        let view_mode = ViewMode::default();
        Self {
            progress: ProgressView::Pending,
            ip_select: SelectBox::with_placeholder(IP_PLACEHOLDER),
            protocol_select: SelectBox::with_placeholder(PICK_IP_FIRST),
            view_mode,
            chart: TimelineChart::new(view_mode),
            events: Vec::new(),
        }
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::new(
            self.ip_select.value(),
            self.protocol_select.value(),
            self.view_mode,
        )
    }

    /// A new IP invalidates the protocol choice made for the previous one.
    pub fn on_ip_changed(&mut self) {
        self.protocol_select = SelectBox::with_placeholder(if self.ip_select.value().is_some() {
            ALL_PROTOCOLS
        } else {
            PICK_IP_FIRST
        });
    }

    pub fn set_view_mode(&mut self, view: ViewMode) {
        self.view_mode = view;
        self.chart.height_px = view.chart_height_px();
        self.chart.unit = view.time_unit();
    }

    fn is_current_ip(&self, ip: Option<&str>) -> bool {
        self.ip_select.value() == ip
    }

    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Progress(p) => self.progress = progress_view(p),
            Update::ProgressReset => self.progress = ProgressView::Idle,
            Update::Ips(ips) => self.ip_select.replace(IP_PLACEHOLDER, &ips),
            Update::Protocols { ip, protocols } => {
                if !self.is_current_ip(ip.as_deref()) {
                    return;
                }
                match protocols {
                    Some(list) => self.protocol_select.replace(ALL_PROTOCOLS, &list),
                    None => self.protocol_select = SelectBox::with_placeholder(PICK_IP_FIRST),
                }
            }
            Update::Timeline { view, points } => {
                if view != self.view_state() {
                    return;
                }
                self.chart.unit = view.view.time_unit();
                if let Some(points) = points {
                    self.chart.labels = points.iter().map(|p| p.label.clone()).collect();
                    self.chart.data = points.iter().map(|p| p.count).collect();
                }
            }
            Update::Events { ip, rows } => {
                if self.is_current_ip(Some(ip.as_str())) {
                    self.events = rows;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard_with_ip(ip: &str) -> Dashboard {
        let mut d = Dashboard::new();
        d.apply(Update::Ips(vec![ip.to_string()]));
        d.ip_select.select_next();
        d.on_ip_changed();
        d
    }

    #[test]
    fn progress_thresholds() {
        assert_eq!(progress_view(0.0), ProgressView::Idle);
        assert_eq!(
            progress_view(42.0),
            ProgressView::Running {
                value: 42.0,
                text: "42.00%".to_string()
            }
        );
        assert_eq!(
            progress_view(33.3333),
            ProgressView::Running {
                value: 33.3333,
                text: "33.33%".to_string()
            }
        );
        assert_eq!(progress_view(100.0), ProgressView::Completed);
        assert_eq!(progress_view(130.0), ProgressView::Completed);
    }

    #[test]
    fn ip_list_keeps_order_after_placeholder() {
        let mut d = Dashboard::new();
        d.apply(Update::Ips(vec!["10.0.0.1".into(), "10.0.0.2".into()]));

        let texts: Vec<&str> = d
            .ip_select
            .options()
            .iter()
            .map(|o| o.text.as_str())
            .collect();
        assert_eq!(texts, vec![IP_PLACEHOLDER, "10.0.0.1", "10.0.0.2"]);
        assert_eq!(d.ip_select.value(), None);
    }

    #[test]
    fn protocols_populate_for_selected_ip() {
        let mut d = dashboard_with_ip("10.0.0.1");
        d.apply(Update::Protocols {
            ip: Some("10.0.0.1".into()),
            protocols: Some(vec!["TCP".into(), "UDP".into()]),
        });

        let texts: Vec<&str> = d
            .protocol_select
            .options()
            .iter()
            .map(|o| o.text.as_str())
            .collect();
        assert_eq!(texts, vec![ALL_PROTOCOLS, "TCP", "UDP"]);
    }

    #[test]
    fn protocols_without_ip_show_single_placeholder() {
        let mut d = Dashboard::new();
        d.apply(Update::Protocols {
            ip: None,
            protocols: None,
        });
        assert_eq!(d.protocol_select.options().len(), 1);
        assert_eq!(d.protocol_select.options()[0].text, PICK_IP_FIRST);
    }

    #[test]
    fn stale_protocols_are_dropped() {
        let mut d = dashboard_with_ip("10.0.0.1");
        d.apply(Update::Protocols {
            ip: Some("10.0.0.9".into()),
            protocols: Some(vec!["ICMP".into()]),
        });
        assert_eq!(d.protocol_select.options().len(), 1);
    }

    #[test]
    fn changing_ip_resets_protocol() {
        let mut d = Dashboard::new();
        d.apply(Update::Ips(vec!["10.0.0.1".into(), "10.0.0.2".into()]));
        d.ip_select.select_next();
        d.on_ip_changed();
        d.apply(Update::Protocols {
            ip: Some("10.0.0.1".into()),
            protocols: Some(vec!["TCP".into()]),
        });
        d.protocol_select.select_next();
        assert_eq!(d.view_state().protocol.as_deref(), Some("TCP"));

        d.ip_select.select_next();
        d.on_ip_changed();
        let view = d.view_state();
        assert_eq!(view.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(view.protocol, None);
    }

    #[test]
    fn timeline_replaces_series() {
        let mut d = dashboard_with_ip("10.0.0.1");
        let update = Update::Timeline {
            view: ViewState::new(Some("10.0.0.1"), None, ViewMode::Summarized),
            points: Some(vec![ChartPoint {
                label: "12:00".into(),
                count: 5,
            }]),
        };
        d.apply(update.clone());
        d.apply(update);

        assert_eq!(d.chart.labels, vec!["12:00".to_string()]);
        assert_eq!(d.chart.data, vec![5]);
    }

    #[test]
    fn timeline_without_ip_only_sets_unit() {
        let mut d = Dashboard::new();
        d.set_view_mode(ViewMode::Complete);
        d.chart.unit = TimeUnit::Minute;
        d.apply(Update::Timeline {
            view: ViewState::new(None, None, ViewMode::Complete),
            points: None,
        });
        assert_eq!(d.chart.unit, TimeUnit::Second);
        assert!(d.chart.labels.is_empty());
    }

    #[test]
    fn timeline_for_previous_view_or_protocol_is_dropped() {
        let mut d = dashboard_with_ip("10.0.0.1");
        d.apply(Update::Protocols {
            ip: Some("10.0.0.1".into()),
            protocols: Some(vec!["TCP".into()]),
        });
        d.protocol_select.select_next();
        d.set_view_mode(ViewMode::Complete);

        let point = vec![ChartPoint {
            label: "12:00".into(),
            count: 5,
        }];
        d.apply(Update::Timeline {
            view: ViewState::new(Some("10.0.0.1"), Some("TCP"), ViewMode::Summarized),
            points: Some(point.clone()),
        });
        d.apply(Update::Timeline {
            view: ViewState::new(Some("10.0.0.1"), None, ViewMode::Complete),
            points: Some(point),
        });

        assert!(d.chart.labels.is_empty());
        assert_eq!(d.chart.unit, TimeUnit::Second);
    }

    #[test]
    fn events_replace_rather_than_accumulate() {
        let mut d = dashboard_with_ip("1.2.3.4");
        let rows = vec![EventRecord {
            timestamp: "t1".into(),
            ip: "1.2.3.4".into(),
            protocol: "TCP".into(),
        }];
        for _ in 0..3 {
            d.apply(Update::Events {
                ip: "1.2.3.4".into(),
                rows: rows.clone(),
            });
        }
        assert_eq!(d.events, rows);
    }

    #[test]
    fn view_mode_sets_height_and_unit() {
        let mut d = Dashboard::new();
        d.set_view_mode(ViewMode::Complete);
        assert_eq!(d.chart.height_px, 600);
        assert_eq!(d.chart.unit, TimeUnit::Second);

        d.set_view_mode(d.view_mode.toggled());
        assert_eq!(d.chart.height_px, 400);
        assert_eq!(d.chart.unit, TimeUnit::Minute);
    }

    #[test]
    fn empty_strings_are_no_selection() {
        let v = ViewState::new(Some(""), Some(""), ViewMode::Complete);
        assert_eq!(v.ip, None);
        assert_eq!(v.protocol, None);
    }
}
