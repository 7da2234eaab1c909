//! 服务主循环
//!
//! ```text
//! client_1 ─┐
//! client_2 ─┼─► bounded inbox ─► 处理线程 ─► EnvelopeRouter ─► 执行器
//! client_n ─┘                       │
//!                                   └─► ChannelHub ─► 所有客户端
//! ```
//!
//! 所有入站消息在同一个线程上按到达顺序处理，执行器同一时刻只有一条原语在途。

use crate::hub::ChannelHub;
use crate::session::{Inbound, spawn_session};
use crossbeam_channel::{Receiver, Sender};
use dock_actuator::ActuatorTransport;
use dock_orchestrator::{EnvelopeRouter, OrchestratorError, StatusHandle};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// 入站队列容量
pub const INBOX_CAPACITY: usize = 64;

pub struct Server<T: ActuatorTransport> {
    router: EnvelopeRouter<T>,
    hub: Arc<ChannelHub>,
    status: StatusHandle,
    inbox_tx: Sender<Inbound>,
    inbox_rx: Receiver<Inbound>,
}

impl<T: ActuatorTransport> Server<T> {
    pub fn new(router: EnvelopeRouter<T>, hub: Arc<ChannelHub>) -> Self {
        let status = router.orchestrator().status_handle();
        let (inbox_tx, inbox_rx) = crossbeam_channel::bounded(INBOX_CAPACITY);
        Self {
            router,
            hub,
            status,
            inbox_tx,
            inbox_rx,
        }
    }

    /// 入站队列的发送端（用于投递 `Inbound::Shutdown`）
    pub fn inbox(&self) -> Sender<Inbound> {
        self.inbox_tx.clone()
    }

    /// 接受连接并处理入站消息，直到收到 `Inbound::Shutdown`
    pub fn run(mut self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        let hub = Arc::clone(&self.hub);
        let inbox = self.inbox_tx.clone();

        thread::Builder::new()
            .name("accept".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    match stream {
                        Ok(stream) => {
                            if let Err(e) = spawn_session(stream, Arc::clone(&hub), inbox.clone()) {
                                warn!("Failed to start client session: {}", e);
                            }
                        },
                        Err(e) => warn!("Accept failed: {}", e),
                    }
                }
            })?;

        info!("Listening on {}", addr);
        while let Ok(inbound) = self.inbox_rx.recv() {
            if !self.process(inbound) {
                break;
            }
        }
        info!("Processing loop stopped");
        Ok(())
    }

    /// 处理一条入站事件，返回是否继续
    pub fn process(&mut self, inbound: Inbound) -> bool {
        match inbound {
            Inbound::Envelope(value) => self.router.route_and_report(&value),
            Inbound::Status(client) => match serde_json::to_value(&*self.status.load()) {
                Ok(value) => self.hub.send_to(client, &value),
                Err(e) => error!("Failed to encode status: {}", e),
            },
            Inbound::Invalid(e) => {
                let err = OrchestratorError::from(e);
                warn!("Rejected line: {}", err);
                self.router.orchestrator().report(&err);
            },
            Inbound::Disconnected(client) => self.hub.unregister(client),
            Inbound::Shutdown => return false,
        }
        true
    }
}
