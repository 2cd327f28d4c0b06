//! Motion state machine
//!
//! Consumes one instruction line at a time, keeps the machine state (position,
//! coordinate frame, active tool and color, layer heights) and emits segments
//! into a [`SegmentStore`].
//!
//! Nothing here aborts a session. Malformed numbers read as zero, unknown
//! codes are ignored, degenerate arcs move the tool without drawing, and
//! out-of-range tool numbers are wrapped. Each of these is logged and counted
//! in [`ParseDiagnostics`].

use gcodeplay_core::constants::WORKPLACE_COUNT;
use gcodeplay_core::{Color, InterpretError, Plane, Position, ToolIndex, ToolRegistry, Units};
use gcodeplay_settings::{BeltSettings, ColorMode, ColorSettings, Config, ParserSettings};
use glam::DVec3;
use tracing::{trace, warn};

use super::arc::{ArcCenter, ArcInterpolator, ArcMove};
use super::features::{FeatureClassifier, SlicerStyle};
use super::parser::{self, ParsedLine};
use crate::visualizer::segment_store::{Segment, SegmentKind, SegmentStore};

/// Index into the workplace offset table
pub type WorkplaceIndex = usize;

const AXES: [char; 3] = ['X', 'Y', 'Z'];

/// Modal motion group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionMode {
    /// G0
    #[default]
    Rapid,
    /// G1
    Linear,
    /// G2
    ArcCw,
    /// G3
    ArcCcw,
}

impl MotionMode {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Rapid),
            10 => Some(Self::Linear),
            20 => Some(Self::ArcCw),
            30 => Some(Self::ArcCcw),
            _ => None,
        }
    }

    fn segment_kind(&self) -> SegmentKind {
        match self {
            Self::Rapid => SegmentKind::Rapid,
            Self::Linear => SegmentKind::Linear,
            Self::ArcCw => SegmentKind::ArcCw,
            Self::ArcCcw => SegmentKind::ArcCcw,
        }
    }

    /// Working moves cut whenever the spindle runs
    fn is_working(&self) -> bool {
        !matches!(self, Self::Rapid)
    }
}

/// Shear transform for belt printers
///
/// The gantry sits at an angle to the belt, so machine Z also advances the
/// part along Y. Rendering-space Y is `y + z * shear - computed_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeltGeometry {
    pub angle_deg: f64,
    pub shear: f64,
    pub computed_offset: f64,
}

impl BeltGeometry {
    pub fn from_settings(settings: &BeltSettings) -> Self {
        Self {
            angle_deg: settings.angle_deg,
            shear: settings.shear(),
            computed_offset: settings.computed_offset(),
        }
    }

    pub fn to_world(&self, machine: Position) -> Position {
        DVec3::new(
            machine.x,
            machine.y + machine.z * self.shear - self.computed_offset,
            machine.z,
        )
    }
}

/// Interpreter state for one parse session
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Tool tip in rendering space
    pub position: Position,
    /// Tool tip in machine coordinates, before any belt shear
    pub machine_position: Position,
    pub absolute: bool,
    pub units: Units,
    pub active_tool: ToolIndex,
    pub active_color: Color,
    pub active_workplace: WorkplaceIndex,
    pub workplace_offsets: [Position; WORKPLACE_COUNT],
    pub plane: Plane,
    /// Height of the current layer (machine Z)
    pub layer_height: f64,
    pub previous_layer_height: f64,
    pub belt: Option<BeltGeometry>,
    /// mm/min
    pub feed_rate: f64,
    pub spindle_on: bool,
    pub motion_mode: MotionMode,
    /// Set by bare G10, cleared by G11
    pub firmware_retracted: bool,
}

impl MachineState {
    fn new(absolute: bool, color: Color, belt: Option<BeltGeometry>) -> Self {
        let mut state = Self {
            position: DVec3::ZERO,
            machine_position: DVec3::ZERO,
            absolute,
            units: Units::Millimeters,
            active_tool: 0,
            active_color: color,
            active_workplace: 0,
            workplace_offsets: [DVec3::ZERO; WORKPLACE_COUNT],
            plane: Plane::XY,
            layer_height: 0.0,
            previous_layer_height: 0.0,
            belt,
            feed_rate: 0.0,
            spindle_on: false,
            motion_mode: MotionMode::Rapid,
            firmware_retracted: false,
        };
        state.position = state.to_world(DVec3::ZERO);
        state
    }

    /// Map machine coordinates to rendering space
    pub fn to_world(&self, machine: Position) -> Position {
        match &self.belt {
            Some(belt) => belt.to_world(machine),
            None => machine,
        }
    }

    /// Offset of the active workplace
    pub fn workplace_offset(&self) -> Position {
        self.workplace_offsets[self.active_workplace]
    }
}

/// Counters for the recoverable problems met during a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseDiagnostics {
    pub recoverable: usize,
    pub degenerate_arcs: usize,
    pub config_warnings: usize,
    /// The first few problems, for reporting
    pub first_errors: Vec<InterpretError>,
}

impl ParseDiagnostics {
    const MAX_RECORDED: usize = 32;

    pub fn record(&mut self, error: InterpretError) {
        match &error {
            InterpretError::ParseRecoverable { .. } => self.recoverable += 1,
            InterpretError::GeometryDegenerate { .. } => self.degenerate_arcs += 1,
            InterpretError::ConfigurationInvalid { .. } => self.config_warnings += 1,
            InterpretError::Cancelled | InterpretError::EmptyInput => {}
        }
        if self.first_errors.len() < Self::MAX_RECORDED {
            self.first_errors.push(error);
        }
    }

    pub fn total(&self) -> usize {
        self.recoverable + self.degenerate_arcs + self.config_warnings
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// Non-motion effects collected from one line before motion runs
#[derive(Debug, Default)]
struct LineEffects {
    motion: Option<MotionMode>,
    machine_coords: bool,
    home: bool,
    set_workplace: bool,
}

/// The central interpreter
#[derive(Debug, Clone)]
pub struct MotionStateMachine {
    parser: ParserSettings,
    colors: ColorSettings,
    arc: ArcInterpolator,
    registry: ToolRegistry,
    classifier: FeatureClassifier,
    state: MachineState,
    diagnostics: ParseDiagnostics,
}

impl MotionStateMachine {
    /// Build an interpreter using the tool table from `config`.
    pub fn new(config: &Config, style: SlicerStyle) -> Result<Self, InterpretError> {
        Self::with_registry(config, config.tool_registry(), style)
    }

    pub fn with_registry(
        config: &Config,
        registry: ToolRegistry,
        style: SlicerStyle,
    ) -> Result<Self, InterpretError> {
        let arc = ArcInterpolator::new(
            config.parser.arc_segment_length,
            config.parser.arc_radius_fixup,
        )
        .map_err(|e| InterpretError::ConfigurationInvalid {
            reason: e.to_string(),
        })?;

        let color = match config.color.mode {
            ColorMode::Feed => config.color.feed_color(0.0),
            ColorMode::Flat | ColorMode::Feature => registry.color(0),
        };
        let belt = config.machine.belt.as_ref().map(BeltGeometry::from_settings);

        Ok(Self {
            parser: config.parser.clone(),
            colors: config.color.clone(),
            arc,
            registry,
            classifier: FeatureClassifier::new(style),
            state: MachineState::new(config.parser.absolute_by_default, color, belt),
            diagnostics: ParseDiagnostics::default(),
        })
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn classifier(&self) -> &FeatureClassifier {
        &self.classifier
    }

    pub fn diagnostics(&self) -> &ParseDiagnostics {
        &self.diagnostics
    }

    /// Give up the session results.
    pub fn into_parts(self) -> (ToolRegistry, ParseDiagnostics) {
        (self.registry, self.diagnostics)
    }

    /// Interpret one line. Returns the number of segments emitted.
    ///
    /// `stream_offset` is the byte position just past the line; every segment
    /// the line produces carries it.
    pub fn interpret(
        &mut self,
        line: &str,
        line_number: u32,
        stream_offset: u64,
        store: &mut SegmentStore,
    ) -> usize {
        let line = line.trim();
        if line.is_empty() {
            return 0;
        }

        if parser::is_annotation(line) {
            if self.classifier.recognize(line) && self.colors.mode == ColorMode::Feature {
                self.state.active_color = self.classifier.feature_color();
            }
            return 0;
        }

        store.note_instruction(stream_offset);
        let code = parser::strip_comments(line);
        let parsed = parser::tokenize(&code);
        if parsed.is_empty() {
            return 0;
        }

        for token in &parsed.malformed {
            trace!(line_number, token = %token, "Malformed number read as zero");
            self.diagnostics.record(InterpretError::ParseRecoverable {
                line_number,
                reason: format!("malformed number in '{}'", token),
            });
        }

        let before = store.len();
        self.execute(&parsed, line_number, stream_offset, store);
        store.len() - before
    }

    fn execute(
        &mut self,
        line: &ParsedLine,
        line_number: u32,
        stream_offset: u64,
        store: &mut SegmentStore,
    ) {
        let g_codes: Vec<u32> = line.codes('G').collect();
        let m_codes: Vec<u32> = line.codes('M').collect();

        if let Some(feed) = line.get('F') {
            self.set_feed_rate(self.state.units.to_mm(feed));
        }

        let mut effects = LineEffects::default();
        for &code in &g_codes {
            self.apply_g_code(code, line, line_number, &mut effects);
        }
        for &code in &m_codes {
            self.apply_m_code(code, line);
        }

        if let Some(tool) = line.get('T') {
            if g_codes.is_empty() && m_codes.iter().all(|&m| m == 60) {
                self.select_tool(tool as i64, line_number);
            }
        }

        if effects.set_workplace {
            self.set_workplace_offset(line, line_number);
            return;
        }
        if effects.home {
            self.home(line);
            return;
        }

        let motion = match effects.motion {
            Some(mode) => {
                self.state.motion_mode = mode;
                Some(mode)
            }
            None if g_codes.is_empty() && m_codes.is_empty() && line.has_any(&AXES) => {
                Some(self.state.motion_mode)
            }
            None => None,
        };

        if let Some(mode) = motion {
            let target = self.resolve_target(line, effects.machine_coords);
            match mode {
                MotionMode::Rapid | MotionMode::Linear => {
                    self.linear_move(line, mode, target, line_number, stream_offset, store)
                }
                MotionMode::ArcCw | MotionMode::ArcCcw => {
                    self.arc_move(line, mode, target, line_number, stream_offset, store)
                }
            }
        }
    }

    fn apply_g_code(
        &mut self,
        code: u32,
        line: &ParsedLine,
        line_number: u32,
        effects: &mut LineEffects,
    ) {
        if let Some(mode) = MotionMode::from_code(code) {
            effects.motion = Some(mode);
            return;
        }
        match code {
            100 if line.has('L') => effects.set_workplace = true,
            100 => self.state.firmware_retracted = true,
            110 => self.state.firmware_retracted = false,
            170 => self.state.plane = Plane::XY,
            180 => self.state.plane = Plane::XZ,
            190 => self.state.plane = Plane::YZ,
            200 => self.state.units = Units::Inches,
            210 => self.state.units = Units::Millimeters,
            280 => effects.home = true,
            530 => effects.machine_coords = true,
            540 | 550 | 560 | 570 | 580 | 590 => {
                self.state.active_workplace = ((code - 540) / 10) as usize
            }
            591..=593 => self.state.active_workplace = (code - 585) as usize,
            900 => self.state.absolute = true,
            910 => self.state.absolute = false,
            // Position reset; extruder bookkeeping only
            920 => {}
            _ => {
                trace!(line_number, code = code as f64 / 10.0, "Ignoring G code");
                self.diagnostics.record(InterpretError::ParseRecoverable {
                    line_number,
                    reason: format!("unsupported G{}", code as f64 / 10.0),
                });
            }
        }
    }

    fn apply_m_code(&mut self, code: u32, line: &ParsedLine) {
        match code {
            30 | 40 => {
                if line.get('S').unwrap_or(0.0) > 0.0 {
                    self.state.spindle_on = true;
                }
            }
            50 => self.state.spindle_on = false,
            5670 => self.mix_colors(line),
            6000 => {
                let next = (self.state.active_tool + 1) % self.registry.len();
                self.state.active_tool = next;
                if self.colors.mode != ColorMode::Feed {
                    self.state.active_color = self.registry.color(next);
                }
                trace!(tool = next, "Filament change");
            }
            _ => {}
        }
    }

    fn set_feed_rate(&mut self, feed_rate: f64) {
        self.state.feed_rate = feed_rate;
        if self.colors.mode == ColorMode::Feed {
            self.state.active_color = self.colors.feed_color(feed_rate);
        }
    }

    fn select_tool(&mut self, requested: i64, line_number: u32) {
        let resolution = self.registry.resolve(requested);
        if resolution.adjusted {
            warn!(
                line_number,
                requested,
                selected = resolution.index,
                "Tool number out of range"
            );
            self.diagnostics.record(InterpretError::ConfigurationInvalid {
                reason: format!("tool {} resolved to {}", requested, resolution.index),
            });
        }
        self.state.active_tool = resolution.index;
        if self.colors.mode != ColorMode::Feed {
            self.state.active_color = self.registry.color(resolution.index);
        }
    }

    /// Subtractive blend of tool colors by mixing ratio
    fn mix_colors(&mut self, line: &ParsedLine) {
        if self.colors.mode == ColorMode::Feed {
            return;
        }
        let ratios = match (&line.mix, line.get('E')) {
            (Some(mix), _) => mix.clone(),
            (None, Some(e)) => vec![e],
            (None, None) => return,
        };

        let mut rgb = [1.0f32; 3];
        for (idx, ratio) in ratios.iter().enumerate().take(self.registry.len()) {
            let tool = self.registry.color(idx);
            let ratio = *ratio as f32;
            rgb[0] -= (1.0 - tool.r) * ratio;
            rgb[1] -= (1.0 - tool.g) * ratio;
            rgb[2] -= (1.0 - tool.b) * ratio;
        }
        self.state.active_color = Color::new(
            rgb[0].clamp(0.0, 1.0),
            rgb[1].clamp(0.0, 1.0),
            rgb[2].clamp(0.0, 1.0),
            0.1,
        );
    }

    /// `G10 L2` sets an offset directly, `G10 L20` so the current position reads as given
    fn set_workplace_offset(&mut self, line: &ParsedLine, line_number: u32) {
        let p = line.get('P').unwrap_or(0.0).round() as i64;
        let index = match p {
            0 => self.state.active_workplace,
            1..=9 => (p - 1) as usize,
            _ => {
                warn!(line_number, workplace = p, "Workplace out of range");
                self.diagnostics.record(InterpretError::ConfigurationInvalid {
                    reason: format!("workplace P{} does not exist", p),
                });
                return;
            }
        };

        let relative = line.get('L').map(|l| l.round() as i64) == Some(20);
        let mut offset = self.state.workplace_offsets[index];
        for (axis, letter) in AXES.iter().enumerate() {
            if let Some(value) = line.get(*letter) {
                let value = self.state.units.to_mm(value);
                offset[axis] = if relative {
                    self.state.machine_position[axis] - value
                } else {
                    value
                };
            }
        }
        self.state.workplace_offsets[index] = offset;
        trace!(workplace = index, ?offset, "Workplace offset set");
    }

    fn home(&mut self, line: &ParsedLine) {
        let mut target = self.state.machine_position;
        if line.has_any(&AXES) {
            for (axis, letter) in AXES.iter().enumerate() {
                if line.has(*letter) {
                    target[axis] = 0.0;
                }
            }
        } else {
            target = DVec3::ZERO;
        }
        self.commit(target);
    }

    fn resolve_target(&self, line: &ParsedLine, machine_coords: bool) -> Position {
        let offset = if machine_coords {
            DVec3::ZERO
        } else {
            self.state.workplace_offset()
        };
        let mut target = self.state.machine_position;
        for (axis, letter) in AXES.iter().enumerate() {
            if let Some(value) = line.get(*letter) {
                let value = self.state.units.to_mm(value);
                target[axis] = if self.state.absolute || machine_coords {
                    value + offset[axis]
                } else {
                    target[axis] + value
                };
            }
        }
        target
    }

    fn commit(&mut self, machine: Position) {
        self.state.machine_position = machine;
        self.state.position = self.state.to_world(machine);
    }

    fn render_allowed(&self) -> bool {
        !self.parser.perimeter_only || self.classifier.is_perimeter()
    }

    /// Thickness for segments emitted before the next layer change
    fn segment_layer_height(&self) -> f64 {
        if let Some(hint) = self.classifier.height_hint() {
            return hint;
        }
        let height = self.state.layer_height - self.state.previous_layer_height;
        if height > 0.0 {
            height
        } else {
            self.state.machine_position.z.max(0.0)
        }
    }

    fn deposit_color(&self) -> Color {
        let tool_color = self.registry.color(self.state.active_tool);
        let interior = self.classifier.feature_name().is_some() && !self.classifier.is_perimeter();
        if self.colors.mode == ColorMode::Flat && interior && self.state.active_color == tool_color
        {
            self.registry.darker_color(self.state.active_tool)
        } else {
            self.state.active_color
        }
    }

    fn track_layer(&mut self, z: f64, stream_offset: u64, line_number: u32, store: &mut SegmentStore) {
        if z > self.state.layer_height && !self.classifier.is_support() {
            self.state.previous_layer_height = self.state.layer_height;
            self.state.layer_height = z;
            store.push_layer(z, stream_offset, line_number);
            trace!(line_number, height = z, "New layer");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn segment(
        &self,
        start: Position,
        end: Position,
        stream_offset: u64,
        line_number: u32,
        depositing: bool,
        layer_height: f64,
        kind: SegmentKind,
    ) -> Segment {
        Segment {
            start,
            end,
            stream_offset,
            line_number,
            tool_index: self.state.active_tool,
            color: if depositing {
                self.deposit_color()
            } else {
                self.colors.travel_color
            },
            is_depositing: depositing,
            is_perimeter: self.classifier.is_perimeter(),
            layer_height,
            feed_rate: self.state.feed_rate,
            kind,
        }
    }

    fn linear_move(
        &mut self,
        line: &ParsedLine,
        mode: MotionMode,
        target: Position,
        line_number: u32,
        stream_offset: u64,
        store: &mut SegmentStore,
    ) {
        let start = self.state.position;
        let end = self.state.to_world(target);
        let length = start.distance(end);

        let extruding = line.get('E').unwrap_or(0.0) > 0.0
            || (mode == MotionMode::Linear && self.parser.working_moves_deposit);
        let cutting = mode.is_working() && self.state.spindle_on;
        let long_enough = self.parser.working_moves_deposit || length >= self.parser.min_segment_length;
        let layer_height = self.segment_layer_height();
        let render = self.render_allowed();

        self.commit(target);
        if !render || length == 0.0 {
            return;
        }

        if cutting || (extruding && long_enough) {
            self.track_layer(target.z, stream_offset, line_number, store);
            let segment = self.segment(
                start,
                end,
                stream_offset,
                line_number,
                true,
                layer_height,
                mode.segment_kind(),
            );
            store.push(segment);
        } else if self.parser.render_travels && !extruding {
            let segment = self.segment(
                start,
                end,
                stream_offset,
                line_number,
                false,
                layer_height,
                mode.segment_kind(),
            );
            store.push(segment);
        }
    }

    fn arc_move(
        &mut self,
        line: &ParsedLine,
        mode: MotionMode,
        target: Position,
        line_number: u32,
        stream_offset: u64,
        store: &mut SegmentStore,
    ) {
        let plane = self.state.plane;
        let units = self.state.units;
        let center = match line.get('R') {
            Some(radius) => ArcCenter::Radius(units.to_mm(radius)),
            None => {
                let (u_letter, v_letter) = plane.offset_letters();
                ArcCenter::Offset {
                    u: units.to_mm(line.get(u_letter).unwrap_or(0.0)),
                    v: units.to_mm(line.get(v_letter).unwrap_or(0.0)),
                }
            }
        };
        let arc = ArcMove {
            start: self.state.machine_position,
            target,
            plane,
            center,
            clockwise: mode == MotionMode::ArcCw,
        };

        let points = match self.arc.interpolate(&arc) {
            Ok(points) => points,
            Err(source) => {
                warn!(line_number, error = %source, "Degenerate arc skipped");
                self.diagnostics.record(InterpretError::GeometryDegenerate {
                    line_number,
                    source,
                });
                self.commit(target);
                return;
            }
        };

        let depositing = line.get('E').unwrap_or(0.0) > 0.0
            || self.parser.working_moves_deposit
            || self.state.spindle_on;
        let layer_height = self.segment_layer_height();
        let render = self.render_allowed() && (depositing || self.parser.render_travels);

        if render {
            if depositing {
                self.track_layer(target.z, stream_offset, line_number, store);
            }
            let mut start = self.state.position;
            for point in &points {
                let end = self.state.to_world(*point);
                let segment = self.segment(
                    start,
                    end,
                    stream_offset,
                    line_number,
                    depositing,
                    layer_height,
                    mode.segment_kind(),
                );
                store.push(segment);
                start = end;
            }
        }
        self.commit(target);
    }
}
