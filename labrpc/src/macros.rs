#[macro_export]
macro_rules! random_error {
    ($prob:tt) => {
        #[cfg(debug_assertions)]
        {
            use $crate::rand::Rng;
            let x: f32 = $crate::rand::thread_rng().gen_range(0.0..1.0);
            if x < $prob {
                $crate::log::error!("random error");
                return Err($crate::anyhow::anyhow!("random error"));
            }
        }
    };
}

#[macro_export]
macro_rules! service {
    () => {
        compile_error!("empty service is not allowed");
    };
    (
        $(#[$service_attr:meta])*
        service $svc_name:ident {
            $(
                $(#[$method_attr:meta])*
                fn $method_name:ident($($arg_id:ident: $arg_ty:ty),*) -> $output:ty;
            )*
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$service_attr])*
        pub mod $svc_name {
            use super::*;

            use $crate::network::NetworkPackage;
            use $crate::{server, client};

            use $crate::tokio::sync::mpsc::{self, Sender, Receiver};
            use $crate::tokio::time;
            use $crate::serde_json;
            use $crate::serde::{Serialize, Deserialize};
            use $crate::anyhow::{Result, anyhow};
            use $crate::async_trait;
            use $crate::log::{trace, warn};

            use std::time::Duration;

            #[derive(Debug, Deserialize, Serialize)]
            pub enum Request {
                $(
                    #[allow(non_camel_case_types)]
                    $method_name {  $($arg_id : $arg_ty),* }
                ),*
            }

            mod response {
                use super::*;
                $(
                    #[derive(Deserialize, Serialize)]
                    #[allow(non_camel_case_types)]
                    pub struct $method_name {
                        pub data: std::result::Result<$output, String>,
                    }
                )*
            }

            #[async_trait]
            pub trait Service: Send + 'static {
                $(
                    $(#[$method_attr])*
                    async fn $method_name(&mut self, $($arg_id : $arg_ty),* ) -> Result<$output>;
                )*
            }

            #[derive(Debug, Clone)]
            pub struct Client {
                server_id: String,
                tx: Sender<NetworkPackage>,
                timeout: Duration,
            }

            impl Client {
                /// Bound every call of this handle by `timeout`.
                pub fn with_timeout(mut self, timeout: Duration) -> Self {
                    self.timeout = timeout;
                    self
                }

                pub fn server_id(&self) -> &str {
                    &self.server_id
                }

                $(
                    pub async fn $method_name(&self, $($arg_id : $arg_ty),* ) -> Result<$output> {
                        let req = Request::$method_name {
                            $($arg_id),*
                        };
                        let resp = self.call(serde_json::to_string(&req)?).await?;
                        let resp: response::$method_name = serde_json::from_str(&resp)?;
                        resp.data.map_err(|e| anyhow!("{}: {}", self.server_id, e))
                    }
                )*

                pub async fn call(&self, req: String) -> Result<String> {
                    let (tx, mut rx) = mpsc::channel(1);
                    self.tx
                        .send(NetworkPackage { to: self.server_id.clone(), reply: tx, data: req.clone() })
                        .await
                        .map_err(|_| anyhow!("transport to {} is closed", self.server_id))?;
                    match time::timeout(self.timeout, rx.recv()).await {
                        Ok(Some(resp)) => {
                            trace!("req: {}, resp: {}", req, &resp);
                            Ok(resp)
                        }
                        Ok(None) => Err(anyhow!("unable to receive from {}", self.server_id)),
                        Err(_) => Err(anyhow!("call to {} timed out after {:?}", self.server_id, self.timeout)),
                    }
                }
            }

            impl client::Client for Client {
                fn from_server(server_id: String, net_tx: Sender<NetworkPackage>) -> Self {
                    Self {
                        server_id,
                        tx: net_tx,
                        timeout: client::DEFAULT_TIMEOUT,
                    }
                }
            }

            #[derive(Debug)]
            pub struct Server<T: Service + Send> {
                svc: T,
                tx: Sender<NetworkPackage>,
                rx: Receiver<NetworkPackage>,
            }

            #[async_trait]
            impl<T: Service + Send> server::Server for Server<T> {
                type Service = T;

                fn from_service(svc: Self::Service) -> Self {
                    let (tx, rx) = mpsc::channel(100);
                    Self {svc, tx, rx}
                }

                fn client_chan(&self) -> Sender<NetworkPackage> {
                    self.tx.clone()
                }

                async fn handle(&mut self) -> Result<()> {
                    let NetworkPackage { reply, data, .. } = self
                        .rx
                        .recv()
                        .await
                        .expect("server holds a sender of its own channel");
                    trace!("handle recv: {}", &data);
                    let req: Request = serde_json::from_str(&data)
                        .map_err(|e| anyhow!("undecodable request {:?}: {}", data, e))?;
                    let resp = match req {
                        $(
                            Request::$method_name { $($arg_id),* } => {
                                let data = self.svc.$method_name($($arg_id),* ).await.map_err(|e| {
                                    warn!("{} failed: {}", stringify!($method_name), e);
                                    e.to_string()
                                });
                                serde_json::to_string(&response::$method_name { data })?
                            }
                        )*
                    };
                    trace!("handle send: {}", &resp);
                    if reply.send(resp).await.is_err() {
                        warn!("caller went away before the reply was sent");
                    }
                    Ok(())
                }
            }
        }
    };
}
