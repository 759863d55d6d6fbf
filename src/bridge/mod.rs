//! Bridge - owns the ports, the shared state and both adapters
//!
//! The bridge:
//! - opens and closes the four ports (physical in/out, virtual in/out)
//! - routes each inbound message through the dispatcher of its side
//! - delivers whatever the adapters put in their outbox
//! - pushes LED state and bank labels to the controller


use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::addressing::{GridCell, Row, COLUMNS, GRID_BUTTONS};
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::error::{BridgeError, Result};
use crate::midi::format_hex;
use crate::state::SharedState;
use crate::surface::{Outbox, PhysicalSurface, Side, VirtualSurface};
use crate::transport::{self, InboundEvent, InputPort, MidiSink, INBOUND_CAPACITY};

/// Port handles; `None` when closed
#[derive(Default)]
struct Ports {
    physical_in: Option<InputPort>,
    physical_out: Option<Box<dyn MidiSink>>,
    virtual_in: Option<InputPort>,
    virtual_out: Option<Box<dyn MidiSink>>,
}

impl Ports {
    fn output(&mut self, side: Side) -> Option<&mut Box<dyn MidiSink>> {
        match side {
            Side::Physical => self.physical_out.as_mut(),
            Side::Virtual => self.virtual_out.as_mut(),
        }
    }

    fn close(&mut self) {
        // Inputs first so no callback races a closing output
        if let Some(port) = self.physical_in.take() {
            port.close();
        }
        if let Some(port) = self.virtual_in.take() {
            port.close();
        }
        self.physical_out = None;
        self.virtual_out = None;
    }
}

/// MIDI Mix <-> virtual endpoint bridge
pub struct Bridge {
    config: AppConfig,
    state: SharedState,
    physical: PhysicalSurface,
    software: VirtualSurface,
    physical_dispatch: Dispatcher,
    virtual_dispatch: Dispatcher,
    ports: Ports,
    event_tx: mpsc::Sender<InboundEvent>,
    event_rx: Option<mpsc::Receiver<InboundEvent>>,
}

impl Bridge {
    /// Create a bridge with all-off state at bank 0. No ports are opened.
    pub fn new(config: AppConfig) -> Self {
        let state = SharedState::new(config.layout);
        let (event_tx, event_rx) = mpsc::channel(INBOUND_CAPACITY);

        Self {
            physical: PhysicalSurface::new(state.clone()),
            software: VirtualSurface::new(state.clone()),
            physical_dispatch: Dispatcher::new(Side::Physical),
            virtual_dispatch: Dispatcher::new(Side::Virtual),
            ports: Ports::default(),
            config,
            state,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Handle to the shared state
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Take the inbound event receiver (for the main loop to consume)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.event_rx.take()
    }

    /// Sender feeding the inbound queue, for transports other than midir
    pub fn event_sender(&self) -> mpsc::Sender<InboundEvent> {
        self.event_tx.clone()
    }

    /// Use the given sinks as outputs instead of opening MIDI ports
    pub fn attach_outputs(&mut self, physical: Box<dyn MidiSink>, software: Box<dyn MidiSink>) {
        self.ports.physical_out = Some(physical);
        self.ports.virtual_out = Some(software);
    }

    pub fn is_connected(&self) -> bool {
        self.ports.physical_out.is_some() && self.ports.virtual_out.is_some()
    }

    /// Open all ports and sync the LEDs. Returns false if a port is missing;
    /// the caller should abort.
    pub fn initialize(&mut self) -> bool {
        match self.connect() {
            Ok(()) => {
                self.resync_leds();
                self.show_bank();
                true
            }
            Err(e) => {
                error!("Bridge initialization failed: {}", e);
                false
            }
        }
    }

    /// Open all four ports. On failure nothing stays open.
    pub fn connect(&mut self) -> Result<()> {
        self.ports.close();

        let result = self.open_ports();
        if result.is_err() {
            self.ports.close();
        }
        result
    }

    fn open_ports(&mut self) -> Result<()> {
        let physical = &self.config.physical;
        info!(
            "Connecting to controller - Input: '{}', Output: '{}'",
            physical.input_port, physical.output_port
        );

        self.ports.physical_out = Some(Box::new(transport::open_output(
            Side::Physical,
            &physical.output_port,
        )?));
        self.ports.physical_in = Some(transport::open_input(
            Side::Physical,
            &physical.input_port,
            self.event_tx.clone(),
        )?);

        let (virtual_in, virtual_out) = self.open_virtual_ports()?;
        self.ports.virtual_in = Some(virtual_in);
        self.ports.virtual_out = Some(Box::new(virtual_out));

        info!("All ports connected");
        Ok(())
    }

    fn open_virtual_ports(&self) -> Result<(InputPort, transport::OutputPort)> {
        let ports = &self.config.virtual_port;

        if ports.create_virtual {
            #[cfg(unix)]
            {
                let output = transport::create_virtual_output(&ports.output_port)?;
                let input =
                    transport::create_virtual_input(&ports.input_port, self.event_tx.clone())?;
                return Ok((input, output));
            }

            #[cfg(not(unix))]
            {
                warn!("Virtual port creation is not supported here; looking ports up by name");
            }
        }

        info!(
            "Connecting to virtual endpoint - Input: '{}', Output: '{}'",
            ports.input_port, ports.output_port
        );
        let output = transport::open_output(Side::Virtual, &ports.output_port)?;
        let input = transport::open_input(Side::Virtual, &ports.input_port, self.event_tx.clone())?;
        Ok((input, output))
    }

    /// Route one inbound message and deliver the result
    pub fn handle(&mut self, source: Side, data: &[u8]) -> Outbox {
        let bank_before = self.state.current_bank();

        let outbox = match source {
            Side::Physical => self.physical_dispatch.dispatch(data, &self.physical),
            Side::Virtual => self.virtual_dispatch.dispatch(data, &self.software),
        };
        self.deliver(&outbox);

        if self.state.current_bank() != bank_before {
            self.show_bank();
        }

        outbox
    }

    /// Convenience for the main loop
    pub fn handle_event(&mut self, event: &InboundEvent) -> Outbox {
        self.handle(event.source, &event.data)
    }

    fn deliver(&mut self, outbox: &Outbox) {
        for routed in outbox.iter() {
            if let Err(e) = self.send_to(routed.to, &routed.event.to_bytes()) {
                warn!("{}", e);
            }
        }
    }

    fn send_to(&mut self, side: Side, data: &[u8]) -> Result<()> {
        let sink = self
            .ports
            .output(side)
            .ok_or(BridgeError::NotConnected(side))?;
        sink.send(data)?;
        debug!("{} TX {}", side, format_hex(data));
        Ok(())
    }

    /// Send every grid LED of the current bank to the controller
    pub fn resync_leds(&mut self) {
        let mut out = Outbox::new();
        {
            let state = self.state.lock();
            for row in Row::ALL {
                for (column, on) in state.store.get(state.bank, row).into_iter().enumerate() {
                    let cell = GridCell {
                        row,
                        column: column as u8,
                    };
                    out.push_led(&state.layout, cell, on);
                }
            }
        }
        debug_assert_eq!(out.len(), Row::ALL.len() * COLUMNS);
        self.deliver(&out);
    }

    /// Push the bank label to the controller display, if one is configured
    fn show_bank(&mut self) {
        let Some(display) = self.config.display else {
            return;
        };
        let label = format!("Bank {:02}", self.state.current_bank() + 1);
        let frame = display.encode_cell(0, 0, &label);
        if let Err(e) = self.send_to(Side::Physical, &frame) {
            warn!("Failed to update display: {}", e);
        }
    }

    /// Apply a reloaded configuration. Layout and display take effect
    /// immediately; port changes need a restart.
    pub fn apply_config(&mut self, new_config: AppConfig) {
        if self.config.ports_differ(&new_config) {
            warn!("Port settings changed; restart the bridge to use the new ports");
        }

        let layout_changed = self.config.layout != new_config.layout;
        self.state.set_layout(new_config.layout);

        self.config.layout = new_config.layout;
        self.config.display = new_config.display;

        if layout_changed {
            info!("Layout updated");
            self.resync_leds();
        }
    }

    /// Turn the grid LEDs off and close all ports. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.ports.physical_out.is_some() {
            let layout = self.state.layout();
            let mut out = Outbox::new();
            for button in 1..=GRID_BUTTONS {
                if let Some(cell) = GridCell::from_button(button) {
                    out.push_led(&layout, cell, false);
                }
            }
            self.deliver(&out);
        }

        self.ports.close();
        info!("Bridge ports closed");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.ports.close();
    }
}
